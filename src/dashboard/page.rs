//! Static dashboard page. Polls the JSON API; no server-side templating.

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>keyprobe</title>
<style>
  body { font-family: monospace; background: #0f0c29; color: #e6f7ff; margin: 0; padding: 20px; }
  .stats { display: flex; gap: 24px; flex-wrap: wrap; margin-bottom: 16px; }
  .stats div { background: #1a1a2e; padding: 12px 16px; border-radius: 8px; }
  button { margin-right: 8px; padding: 8px 16px; }
  #console { background: #000; height: 420px; overflow-y: auto; padding: 8px; margin-top: 16px; }
  .info { color: #f5f5f5; } .success { color: #00b894; } .warning { color: #fdcb6e; }
  .error { color: #d63031; } .highlight { color: #00cec9; } .notice { color: #e056fd; }
  .system { color: #74b9ff; }
</style>
</head>
<body>
<h1>keyprobe</h1>
<div class="stats">
  <div>Host: <span id="host">-</span></div>
  <div>State: <span id="state">-</span></div>
  <div>Generated: <span id="generated">0</span></div>
  <div>With balance: <span id="matched">0</span></div>
  <div>Avg response: <span id="latency">0</span> ms</div>
  <div>Success: <span id="ratio">100</span>%</div>
  <div>Speed: <span id="speed">-</span>/5</div>
  <div>Uptime: <span id="uptime">0</span> s</div>
  <div>Last found: <span id="last">never</span></div>
</div>
<button onclick="post('/api/start')">Start</button>
<button onclick="post('/api/stop')">Stop</button>
<button onclick="post('/api/speed', {change: 1})">Faster</button>
<button onclick="post('/api/speed', {change: -1})">Slower</button>
<button onclick="post('/api/clear')">Clear</button>
<a href="/api/export"><button>Export</button></a>
<div id="console"></div>
<script>
async function post(url, body) {
  await fetch(url, {method: 'POST', headers: {'Content-Type': 'application/json'},
                    body: JSON.stringify(body || {})});
  refresh();
}
async function refresh() {
  const s = await (await fetch('/api/stats')).json();
  document.getElementById('host').textContent = s.host;
  document.getElementById('state').textContent = s.state;
  document.getElementById('generated').textContent = s.generated_count;
  document.getElementById('matched').textContent = s.matched_count;
  document.getElementById('latency').textContent = s.avg_latency_ms.toFixed(1);
  document.getElementById('ratio').textContent = s.success_ratio.toFixed(1);
  document.getElementById('speed').textContent = s.speed_level;
  document.getElementById('uptime').textContent = s.uptime_secs;
  document.getElementById('last').textContent = s.last_match_at || 'never';
  const log = await (await fetch('/api/log')).json();
  const el = document.getElementById('console');
  el.replaceChildren(...log.output.map(e => {
    const d = document.createElement('div');
    d.className = e.tone;
    d.textContent = e.line;
    return d;
  }));
  el.scrollTop = el.scrollHeight;
}
setInterval(refresh, 1000);
refresh();
</script>
</body>
</html>
"#;
