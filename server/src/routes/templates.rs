//! Inline minijinja templates for the dashboard pages. Kept as consts so the
//! server ships as a single binary.

pub const WELCOME_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Email Triage Assistant</title>
  <style>
    body { font-family: sans-serif; max-width: 640px; margin: 60px auto; color: #222; }
    a.button { display: inline-block; padding: 10px 18px; background: #1a73e8; color: #fff;
               border-radius: 6px; text-decoration: none; margin-right: 12px; }
    a.secondary { background: #5f6368; }
  </style>
</head>
<body>
  <h1>Email Triage Assistant</h1>
  <p>Monitoring unread mail for <b>{{ user_email }}</b>.</p>
  <p>
    Unread messages are fetched from Gmail, classified by priority and
    category, and high priority senders can get an automatic reply draft.
  </p>
  <p>
    <a class="button" href="/dashboard">Open dashboard</a>
    <a class="button secondary" href="/debug">Debug info</a>
  </p>
</body>
</html>
"#;

pub const DASHBOARD_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Inbox Dashboard</title>
  <style>
    body { font-family: sans-serif; max-width: 960px; margin: 30px auto; color: #222; }
    .stats { display: flex; gap: 16px; margin-bottom: 20px; }
    .stat { border: 1px solid #ddd; border-radius: 8px; padding: 12px 20px; text-align: center; }
    .stat .num { font-size: 28px; font-weight: bold; }
    .critical { color: #c5221f; }
    .high { color: #e37400; }
    .medium { color: #1a73e8; }
    .low { color: #5f6368; }
    button { padding: 8px 16px; border: none; border-radius: 6px; background: #1a73e8;
             color: #fff; cursor: pointer; margin-right: 8px; }
    button.drafts { background: #188038; }
    .email { border-bottom: 1px solid #eee; padding: 10px 4px; }
    .email .subject { font-weight: bold; }
    .email .meta { font-size: 13px; color: #5f6368; }
    .badge { font-size: 12px; border-radius: 10px; padding: 2px 8px; background: #eee; margin-left: 6px; }
    .banner { background: #fef7e0; border: 1px solid #f9ab00; border-radius: 6px;
              padding: 8px 12px; margin-bottom: 16px; display: none; }
    h2 { margin-top: 28px; }
    #status { margin-left: 12px; color: #5f6368; }
  </style>
</head>
<body>
  <h1>Inbox Dashboard</h1>
  <div id="demo-banner" class="banner">Showing demo data, Gmail is not connected.</div>
  <p>
    <button onclick="triggerRefresh()">Refresh</button>
    <button class="drafts" onclick="createDrafts()">Create reply drafts</button>
    <span id="status"></span>
  </p>
  <div class="stats">
    <div class="stat"><div class="num" id="total">0</div>unread</div>
    <div class="stat"><div class="num critical" id="critical">0</div>critical</div>
    <div class="stat"><div class="num high" id="high">0</div>high</div>
    <div class="stat"><div class="num medium" id="medium">0</div>medium</div>
    <div class="stat"><div class="num low" id="low">0</div>low</div>
  </div>
  <h2>Direct (<span id="direct-count">0</span>)</h2>
  <div id="direct"></div>
  <h2>CC (<span id="cc-count">0</span>)</h2>
  <div id="cc"></div>

  <script>
    function emailRow(e) {
      const div = document.createElement('div');
      div.className = 'email';
      const subject = document.createElement('div');
      subject.className = 'subject ' + e.priority;
      subject.textContent = e.subject;
      const meta = document.createElement('div');
      meta.className = 'meta';
      meta.textContent = e.sender + ' · ' + e.date + ' ' + e.time;
      const badge = document.createElement('span');
      badge.className = 'badge';
      badge.textContent = e.category + (e.ai_classified ? ' · ai' : '');
      meta.appendChild(badge);
      div.appendChild(subject);
      div.appendChild(meta);
      return div;
    }

    function renderList(id, emails) {
      const el = document.getElementById(id);
      el.replaceChildren();
      emails.forEach(e => el.appendChild(emailRow(e)));
    }

    async function loadEmails() {
      const resp = await fetch('/api/emails');
      const data = await resp.json();
      document.getElementById('total').textContent = data.stats.total_unread;
      document.getElementById('critical').textContent = data.stats.priority_counts.critical;
      document.getElementById('high').textContent = data.stats.priority_counts.high;
      document.getElementById('medium').textContent = data.stats.priority_counts.medium;
      document.getElementById('low').textContent = data.stats.priority_counts.low;
      document.getElementById('direct-count').textContent = data.stats.direct_count;
      document.getElementById('cc-count').textContent = data.stats.cc_count;
      renderList('direct', data.direct_emails);
      renderList('cc', data.cc_emails);
      document.getElementById('demo-banner').style.display = data.demo_mode ? 'block' : 'none';
      document.getElementById('status').textContent = data.is_processing
        ? 'refreshing…'
        : (data.last_updated ? 'updated ' + data.last_updated : '');
    }

    async function triggerRefresh() {
      const resp = await fetch('/api/refresh', { method: 'POST' });
      const data = await resp.json();
      document.getElementById('status').textContent = data.status;
      setTimeout(loadEmails, 2000);
    }

    async function createDrafts() {
      const resp = await fetch('/api/create-drafts', { method: 'POST' });
      const data = await resp.json();
      document.getElementById('status').textContent = data.message || data.error.message;
    }

    loadEmails();
    setInterval(loadEmails, 30000);
  </script>
</body>
</html>
"#;

pub const DEBUG_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Debug</title>
  <style>
    body { font-family: monospace; max-width: 800px; margin: 30px auto; color: #222; }
    pre { background: #f6f8fa; border-radius: 6px; padding: 16px; overflow-x: auto; }
  </style>
</head>
<body>
  <h1>Debug</h1>
  <p><a href="/dashboard">back to dashboard</a></p>
  <pre id="out">loading…</pre>
  <script>
    fetch('/api/debug')
      .then(resp => resp.json())
      .then(data => {
        document.getElementById('out').textContent = JSON.stringify(data, null, 2);
      })
      .catch(err => {
        document.getElementById('out').textContent = String(err);
      });
  </script>
</body>
</html>
"#;
