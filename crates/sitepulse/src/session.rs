use sitepulse_local::pipeline::ScrapedPage;

/// State carried between actions of one interactive run: the last scraped page, if any.
///
/// A scrape creates (or replaces) it; extract and sentiment only read it, so they never
/// re-fetch.
#[derive(Debug, Default)]
pub struct Session {
    page: Option<ScrapedPage>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a freshly scraped page, returning the one it replaces.
    pub fn replace(&mut self, page: ScrapedPage) -> Option<ScrapedPage> {
        self.page.replace(page)
    }

    pub fn page(&self) -> Option<&ScrapedPage> {
        self.page.as_ref()
    }

    pub fn url(&self) -> Option<&str> {
        self.page.as_ref().map(|p| p.raw.url.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Scrape(String),
    Show,
    Extract(String),
    Sentiment,
    Help,
    Quit,
}

pub const HELP: &str = "commands:
  scrape <url>            fetch and clean a page
  show                    print the cleaned text of the current page
  extract <instruction>   ask the local model for matching data
  sentiment               per-paragraph sentiment and top words
  help
  quit";

/// Parse one interactive line. Blank lines are `Ok(None)`; the error is a user-facing message.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let cmd = match word.to_ascii_lowercase().as_str() {
        "scrape" => {
            if rest.is_empty() {
                return Err("Please enter a URL.".to_string());
            }
            Command::Scrape(rest.to_string())
        }
        "show" => Command::Show,
        "extract" => {
            if rest.is_empty() {
                return Err("Please describe what to extract.".to_string());
            }
            Command::Extract(rest.to_string())
        }
        "sentiment" => Command::Sentiment,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command: {other} (try `help`)")),
    };
    Ok(Some(cmd))
}
