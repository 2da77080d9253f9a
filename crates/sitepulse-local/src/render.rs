use crate::config::RenderConfig;
use sitepulse_core::{Error, PageRenderer, Result};
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub final_url: String,
    pub status: Option<u16>,
    pub html: String,
    pub elapsed_ms: u64,
}

// Runs under `node -e`; reads its JSON args from stdin and writes exactly one JSON object to
// stdout. The browser is closed in `finally` and close errors are ignored.
const RENDER_JS: &str = r#"
const fs = require('fs');

function ok(obj) { process.stdout.write(JSON.stringify(obj)); }
function bad(code, message) { ok({ ok: false, error: { code, message } }); }

async function main() {
  let arg = '';
  try { arg = fs.readFileSync(0, 'utf8'); } catch (_) {}
  let req;
  try { req = JSON.parse(arg); } catch (e) { return bad('invalid_params', 'bad JSON args'); }

  let pw;
  try { pw = require('playwright'); } catch (e) {
    return bad('not_configured',
      'Playwright is not installed for Node.js; run `npm i -g playwright && npx playwright install chromium`');
  }

  const url = String(req.url || '').trim();
  if (!url) return bad('invalid_params', 'url must be non-empty');

  const t0 = Date.now();
  let browser;
  try {
    browser = await pw.chromium.launch({
      headless: true,
      args: [
        '--disable-gpu',
        '--no-sandbox',
        '--disable-dev-shm-usage',
        '--disable-blink-features=AutomationControlled',
      ],
    });
    const context = await browser.newContext({ userAgent: req.user_agent });
    const page = await context.newPage();
    page.setDefaultNavigationTimeout(Number(req.timeout_ms));
    const resp = await page.goto(url, { timeout: Number(req.timeout_ms) });
    await page.waitForTimeout(Number(req.settle_ms));
    const html = await page.content();
    ok({
      ok: true,
      final_url: page.url(),
      status: resp ? resp.status() : null,
      html,
      elapsed_ms: Date.now() - t0,
    });
  } catch (e) {
    bad('render_failed', String(e && e.message ? e.message : e));
  } finally {
    try { if (browser) await browser.close(); } catch (_) {}
  }
}

main().catch((e) => bad('render_failed', String(e && e.message ? e.message : e)));
"#;

/// Owns the node/browser child process. Dropping it kills the child, so every exit path
/// (timeout, parse failure, early `?`) releases the browser. Kill errors are ignored.
struct BrowserProcess {
    child: tokio::process::Child,
}

impl BrowserProcess {
    fn spawn(cmd: &mut tokio::process::Command) -> Result<Self> {
        let child = cmd
            .kill_on_drop(true)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::NotConfigured(format!(
                    "browser render requires Node.js and the Playwright npm package: {e}"
                ))
            })?;
        Ok(Self { child })
    }
}

impl Drop for BrowserProcess {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
    }
}

fn node_path_has_playwright(np: &str) -> bool {
    np.split(':')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .any(|p| std::path::Path::new(p).join("playwright").is_dir())
}

fn detect_node_path(explicit: Option<&str>) -> Option<String> {
    if let Some(p) = explicit {
        return Some(p.to_string());
    }
    let existing = std::env::var("NODE_PATH").unwrap_or_default();
    if node_path_has_playwright(&existing) {
        return None;
    }

    let mut roots: Vec<String> = Vec::new();
    if let Some(home) = std::env::var_os("HOME").map(std::path::PathBuf::from) {
        roots.push(
            home.join(".npm-global")
                .join("lib")
                .join("node_modules")
                .to_string_lossy()
                .to_string(),
        );
    }
    roots.push("/opt/homebrew/lib/node_modules".to_string());
    roots.push("/usr/local/lib/node_modules".to_string());
    roots.push("/usr/lib/node_modules".to_string());

    let found = roots.into_iter().find(|r| node_path_has_playwright(r))?;
    if existing.trim().is_empty() {
        Some(found)
    } else {
        Some(format!("{existing}:{found}"))
    }
}

/// Whether `playwright` is reachable from the configured or inherited Node module roots.
pub fn playwright_resolvable(cfg: &RenderConfig) -> bool {
    let inherited = std::env::var("NODE_PATH").unwrap_or_default();
    node_path_has_playwright(&inherited)
        || detect_node_path(cfg.node_path.as_deref()).is_some_and(|p| node_path_has_playwright(&p))
}

fn render_args_json(url: &str, cfg: &RenderConfig) -> String {
    serde_json::json!({
        "url": url,
        "user_agent": cfg.user_agent,
        "timeout_ms": cfg.page_load_timeout.as_millis() as u64,
        "settle_ms": cfg.settle.as_millis() as u64,
    })
    .to_string()
}

fn parse_render_output(stdout: &[u8], stderr: &[u8], url: &str) -> Result<RenderedPage> {
    let stdout = String::from_utf8_lossy(stdout).trim().to_string();
    let v: serde_json::Value = serde_json::from_str(&stdout).map_err(|e| {
        let stderr = String::from_utf8_lossy(stderr).trim().to_string();
        if stderr.is_empty() {
            Error::Render(format!("renderer returned invalid JSON: {e}"))
        } else {
            Error::Render(format!("renderer returned invalid JSON: {e}. stderr: {stderr}"))
        }
    })?;

    if v.get("ok").and_then(|x| x.as_bool()) != Some(true) {
        let code = v
            .pointer("/error/code")
            .and_then(|x| x.as_str())
            .unwrap_or("render_failed");
        let message = v
            .pointer("/error/message")
            .and_then(|x| x.as_str())
            .unwrap_or("browser render failed")
            .to_string();
        return Err(match code {
            "not_configured" => Error::NotConfigured(message),
            "invalid_params" => Error::InvalidUrl(message),
            _ => Error::Render(message),
        });
    }

    let html = v
        .get("html")
        .and_then(|x| x.as_str())
        .unwrap_or("")
        .to_string();
    if html.trim().is_empty() {
        return Err(Error::Render("renderer returned empty HTML".to_string()));
    }

    Ok(RenderedPage {
        final_url: v
            .get("final_url")
            .and_then(|x| x.as_str())
            .unwrap_or(url)
            .to_string(),
        status: v.get("status").and_then(|x| x.as_u64()).map(|n| n as u16),
        html,
        elapsed_ms: v.get("elapsed_ms").and_then(|x| x.as_u64()).unwrap_or(0),
    })
}

/// Headless Chromium via Node.js + Playwright.
#[derive(Debug, Clone)]
pub struct ChromiumRenderer {
    cfg: RenderConfig,
}

impl ChromiumRenderer {
    pub fn new(cfg: RenderConfig) -> Self {
        Self { cfg }
    }

    pub fn from_env() -> Self {
        Self::new(RenderConfig::from_env())
    }

    pub async fn render_page(&self, url: &str) -> Result<RenderedPage> {
        if self.cfg.disabled {
            return Err(Error::NotConfigured(
                "browser render disabled (SITEPULSE_RENDER_DISABLE)".to_string(),
            ));
        }

        let mut cmd = tokio::process::Command::new(&self.cfg.node_bin);
        if let Some(np) = detect_node_path(self.cfg.node_path.as_deref()) {
            cmd.env("NODE_PATH", np);
        }
        cmd.arg("-e").arg(RENDER_JS);

        info!(url, "launching headless browser");
        let mut proc = BrowserProcess::spawn(&mut cmd)?;

        if let Some(mut stdin) = proc.child.stdin.take() {
            // A failed write surfaces as a JSON error from the script.
            let _ = stdin
                .write_all(render_args_json(url, &self.cfg).as_bytes())
                .await;
            let _ = stdin.shutdown().await;
        }

        let mut stdout = proc
            .child
            .stdout
            .take()
            .ok_or_else(|| Error::Render("missing stdout pipe".to_string()))?;
        let mut stderr = proc
            .child
            .stderr
            .take()
            .ok_or_else(|| Error::Render("missing stderr pipe".to_string()))?;
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf).await;
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        });

        let hard = self.cfg.hard_timeout;
        match tokio::time::timeout(hard, proc.child.wait()).await {
            Ok(r) => {
                r.map_err(|e| Error::Render(e.to_string()))?;
            }
            Err(_) => {
                stdout_task.abort();
                stderr_task.abort();
                return Err(Error::Render(format!(
                    "browser render hard timeout after {}ms",
                    hard.as_millis()
                )));
            }
        }

        let out_stdout = stdout_task.await.unwrap_or_default();
        let out_stderr = stderr_task.await.unwrap_or_default();
        let page = parse_render_output(&out_stdout, &out_stderr, url)?;
        debug!(
            url,
            final_url = %page.final_url,
            status = ?page.status,
            elapsed_ms = page.elapsed_ms,
            "browser render complete"
        );
        Ok(page)
    }
}

#[async_trait::async_trait]
impl PageRenderer for ChromiumRenderer {
    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn render(&self, url: &str) -> Result<String> {
        self.render_page(url).await.map(|p| p.html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_renderer_fails_without_spawning() {
        let cfg = RenderConfig {
            disabled: true,
            node_bin: "/definitely/not/node".to_string(),
            ..RenderConfig::default()
        };
        let err = ChromiumRenderer::new(cfg)
            .render("https://example.com/")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConfigured(ref m) if m.contains("disabled")));
    }

    #[test]
    fn explicit_node_path_with_playwright_is_resolvable() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RenderConfig {
            node_path: Some(dir.path().to_string_lossy().to_string()),
            ..RenderConfig::default()
        };
        std::fs::create_dir(dir.path().join("playwright")).unwrap();
        assert!(playwright_resolvable(&cfg));
        assert!(!node_path_has_playwright(""));
    }

    #[tokio::test]
    async fn missing_node_binary_is_not_configured() {
        let cfg = RenderConfig {
            node_bin: "/definitely/not/node".to_string(),
            node_path: Some("/nonexistent".to_string()),
            ..RenderConfig::default()
        };
        let err = ChromiumRenderer::new(cfg)
            .render("https://example.com/")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConfigured(_)), "{err}");
    }

    #[test]
    fn script_disables_sandbox_and_automation_flags() {
        assert!(RENDER_JS.contains("--no-sandbox"));
        assert!(RENDER_JS.contains("--disable-blink-features=AutomationControlled"));
        assert!(RENDER_JS.contains("finally"));
    }

    #[test]
    fn args_carry_timeouts_and_user_agent() {
        let v: serde_json::Value =
            serde_json::from_str(&render_args_json("https://x.test/", &RenderConfig::default()))
                .unwrap();
        assert_eq!(v["url"], "https://x.test/");
        assert_eq!(v["timeout_ms"].as_u64(), Some(25_000));
        assert_eq!(v["settle_ms"].as_u64(), Some(3_000));
        assert!(v["user_agent"].as_str().unwrap().starts_with("Mozilla/5.0"));
    }

    #[test]
    fn parse_render_output_maps_error_codes() {
        let out = br#"{"ok":false,"error":{"code":"not_configured","message":"no playwright"}}"#;
        let err = parse_render_output(out, b"", "https://x.test/").unwrap_err();
        assert!(matches!(err, Error::NotConfigured(_)));

        let out = br#"{"ok":false,"error":{"code":"render_failed","message":"Timeout 25000ms"}}"#;
        let err = parse_render_output(out, b"", "https://x.test/").unwrap_err();
        assert!(matches!(err, Error::Render(ref m) if m.contains("Timeout")));

        let err = parse_render_output(b"garbage", b"boom", "https://x.test/").unwrap_err();
        assert!(matches!(err, Error::Render(ref m) if m.contains("stderr: boom")));
    }

    #[test]
    fn parse_render_output_reads_successful_page() {
        let out = br#"{"ok":true,"final_url":"https://x.test/a","status":200,"html":"<html><body>hi</body></html>","elapsed_ms":12}"#;
        let page = parse_render_output(out, b"", "https://x.test/").unwrap();
        assert_eq!(page.final_url, "https://x.test/a");
        assert_eq!(page.status, Some(200));
        assert!(page.html.contains("hi"));

        let empty = br#"{"ok":true,"html":"   "}"#;
        assert!(parse_render_output(empty, b"", "https://x.test/").is_err());
    }
}
