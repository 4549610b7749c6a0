/// Single-page control panel. The browser holds no state of its own: every
/// operation goes through `/api/op/...` and the whole page is re-rendered
/// from the `PanelState` document each response returns.
pub fn app_html() -> String {
    r#"<!doctype html>
<html lang="en">
<head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>kvdeck Control Panel</title>
    <style>
        body { font-family: system-ui, sans-serif; margin: 1.5rem; background: #fafafa; }
        main { max-width: 960px; margin: 0 auto; }
        section { background: #fff; border: 1px solid #ddd; border-radius: 8px; padding: 1rem; margin-bottom: 1rem; }
        h1, h2 { margin-top: 0; }
        label { display: block; margin: 0.4rem 0 0.2rem; font-weight: 600; }
        input, button { font: inherit; }
        input { width: 100%; padding: 0.5rem; border: 1px solid #ccc; border-radius: 6px; box-sizing: border-box; }
        .row { display: grid; grid-template-columns: 1fr 1fr 1fr; gap: 0.75rem; }
        .actions { margin-top: 0.6rem; display: flex; gap: 0.5rem; flex-wrap: wrap; }
        button { padding: 0.5rem 0.8rem; border: 1px solid #888; border-radius: 6px; background: #f5f5f5; cursor: pointer; }
        pre { background: #111; color: #f2f2f2; padding: 0.8rem; border-radius: 6px; overflow: auto; }
        #status-line { min-height: 1.4rem; font-weight: 600; }
        #status-line.ok { color: #1a7f37; }
        #status-line.err { color: #b42318; }
        #key-list { line-height: 1.6; padding-left: 1.2rem; }
        #key-list li { cursor: pointer; }
        #key-list li:hover { text-decoration: underline; }
        .muted { color: #666; font-size: 0.92rem; }
    </style>
</head>
<body>
    <main>
        <h1>kvdeck Control Panel</h1>
        <p id="status-line" class="ok"></p>

        <section>
            <h2>Set Key</h2>
            <div class="row">
                <div>
                    <label for="set-key">Key</label>
                    <input id="set-key" placeholder="session:42" />
                </div>
                <div>
                    <label for="set-value">Value</label>
                    <input id="set-value" placeholder="payload" />
                </div>
                <div>
                    <label for="set-ttl">TTL seconds (optional)</label>
                    <input id="set-ttl" placeholder="60" />
                </div>
            </div>
            <div class="actions"><button onclick="setKey()">Set</button></div>
        </section>

        <section>
            <h2>Lookup</h2>
            <label for="lookup-key">Key</label>
            <input id="lookup-key" placeholder="session:42" />
            <div class="actions">
                <button onclick="lookupKey()">Get</button>
                <button onclick="deleteKey()">Delete</button>
            </div>
            <pre id="lookup-output">(nothing looked up yet)</pre>
        </section>

        <section>
            <h2>Keys (<span id="key-count">0</span>)</h2>
            <p class="muted">Click a key to look it up.</p>
            <div class="actions"><button onclick="postOp('refresh-keys')">Refresh</button></div>
            <ul id="key-list"></ul>
        </section>

        <section>
            <h2>Administration</h2>
            <div class="actions">
                <button onclick="postOp('clear')">Clear All Keys</button>
                <button onclick="postOp('compact')">Compact WAL</button>
            </div>
        </section>

        <section>
            <h2>Statistics</h2>
            <div class="actions"><button onclick="postOp('refresh-stats')">Refresh Stats</button></div>
            <pre id="stats-output">(no stats yet)</pre>
        </section>
    </main>

    <script>
        async function postOp(name, body) {
            const response = await fetch('/api/op/' + name, {
                method: 'POST',
                headers: { 'content-type': 'application/json' },
                body: JSON.stringify(body || {})
            });
            render(await response.json());
        }

        function render(state) {
            const status = document.getElementById('status-line');
            status.textContent = state.status.text;
            status.className = state.status.ok ? 'ok' : 'err';

            document.getElementById('key-count').textContent = state.keys.count;
            const list = document.getElementById('key-list');
            list.textContent = '';
            for (const entry of state.keys.entries) {
                const item = document.createElement('li');
                item.textContent = entry.key;
                item.dataset.key = entry.key;
                list.appendChild(item);
            }

            const lookup = document.getElementById('lookup-output');
            if (state.lookup.kind === 'record') {
                lookup.textContent = JSON.stringify(state.lookup.record, null, 2);
            } else if (state.lookup.kind === 'not_found') {
                lookup.textContent = 'Key not found';
            } else {
                lookup.textContent = '(nothing looked up yet)';
            }

            const stats = document.getElementById('stats-output');
            stats.textContent = state.stats.snapshot
                ? JSON.stringify(state.stats.snapshot, null, 2)
                : '(no stats yet)';

            if (state.pending_ack) {
                alert(state.pending_ack);
                postOp('ack');
            }
        }

        function setKey() {
            postOp('set', {
                key: document.getElementById('set-key').value,
                value: document.getElementById('set-value').value,
                ttl: document.getElementById('set-ttl').value
            });
        }

        function lookupKey() {
            postOp('lookup', { key: document.getElementById('lookup-key').value });
        }

        function deleteKey() {
            postOp('delete', { key: document.getElementById('lookup-key').value });
        }

        // One delegated listener for the whole list; entries carry their key
        // in a data attribute, never in generated handler code.
        document.getElementById('key-list').addEventListener('click', (event) => {
            const key = event.target.dataset.key;
            if (!key) { return; }
            document.getElementById('lookup-key').value = key;
            postOp('lookup', { key });
        });

        async function boot() {
            const response = await fetch('/api/state');
            render(await response.json());
            await postOp('refresh-keys');
            await postOp('refresh-stats');
        }
        boot();
    </script>
</body>
</html>
"#
    .to_string()
}
