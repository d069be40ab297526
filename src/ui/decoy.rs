use std::time::{SystemTime, UNIX_EPOCH};

/// Innocuous stand-in screens shown while privacy mode is active. Each
/// renders as something plausibly work-related.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoyScreen {
    CodeListing,
    LogStream,
    ShellTranscript,
    StatusDashboard,
}

impl DecoyScreen {
    pub const ALL: [DecoyScreen; 4] = [
        DecoyScreen::CodeListing,
        DecoyScreen::LogStream,
        DecoyScreen::ShellTranscript,
        DecoyScreen::StatusDashboard,
    ];

    pub fn body(&self) -> &'static str {
        match self {
            DecoyScreen::CodeListing => CODE_LISTING,
            DecoyScreen::LogStream => LOG_STREAM,
            DecoyScreen::ShellTranscript => SHELL_TRANSCRIPT,
            DecoyScreen::StatusDashboard => STATUS_DASHBOARD,
        }
    }
}

/// Chooses which decoy to show each time privacy mode is entered. Behind a
/// trait so tests can pin the choice.
pub trait DecoySelector {
    fn pick(&mut self, count: usize) -> usize;
}

/// Xorshift-based selector seeded from the clock. Variety matters here,
/// not statistical quality.
pub struct EntropySelector {
    state: u64,
}

impl EntropySelector {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9E3779B97F4A7C15);
        Self {
            state: seed | 1,
        }
    }
}

impl Default for EntropySelector {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoySelector for EntropySelector {
    fn pick(&mut self, count: usize) -> usize {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        (self.state % count.max(1) as u64) as usize
    }
}

/// Always returns the same index. Used in tests to make the decoy output
/// deterministic.
pub struct FixedSelector(pub usize);

impl DecoySelector for FixedSelector {
    fn pick(&mut self, count: usize) -> usize {
        self.0 % count.max(1)
    }
}

const CODE_LISTING: &str = r#"// buffer.rs
impl RingBuffer {
    pub fn push(&mut self, value: u8) -> Result<(), BufferFull> {
        if self.len == self.data.len() {
            return Err(BufferFull);
        }
        let tail = (self.head + self.len) % self.data.len();
        self.data[tail] = value;
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        let value = self.data[self.head];
        self.head = (self.head + 1) % self.data.len();
        self.len -= 1;
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn wraps_around() { /* ... */ }
}"#;

const LOG_STREAM: &str = r#"2026-08-06T09:12:44Z INFO  worker-3 request completed path=/api/v2/items status=200 dur=12ms
2026-08-06T09:12:45Z INFO  worker-1 request completed path=/api/v2/items status=200 dur=9ms
2026-08-06T09:12:47Z WARN  scheduler queue depth above threshold depth=128
2026-08-06T09:12:48Z INFO  worker-2 cache refresh complete entries=4096
2026-08-06T09:12:51Z INFO  worker-3 request completed path=/api/v2/search status=200 dur=87ms
2026-08-06T09:12:53Z ERROR worker-4 upstream timeout host=replica-2 retrying in 500ms
2026-08-06T09:12:54Z INFO  worker-4 retry succeeded host=replica-2
2026-08-06T09:12:58Z INFO  compactor segment merged size=48MiB
2026-08-06T09:13:01Z INFO  worker-1 request completed path=/api/v2/items status=200 dur=11ms
2026-08-06T09:13:05Z INFO  heartbeat ok instances=6"#;

const SHELL_TRANSCRIPT: &str = r#"$ git status
On branch feature/batch-export
Your branch is up to date with 'origin/feature/batch-export'.

Changes not staged for commit:
  modified:   src/export/writer.rs
  modified:   src/export/schema.rs

$ cargo test export::
   Compiling exporter v0.4.2
    Finished test [unoptimized + debuginfo] target(s) in 4.31s
     Running unittests src/lib.rs

running 14 tests
test export::writer::tests::chunked_write ... ok
test export::writer::tests::empty_batch ... ok
test result: ok. 14 passed; 0 failed; 0 ignored

$ "#;

const STATUS_DASHBOARD: &str = r#"================ service status ================
  api-gateway        up       42d 11h     0.2% err
  auth               up       42d 11h     0.0% err
  search             up        3d 02h     0.4% err
  indexer            up        3d 02h     queue 17
  billing            up       42d 11h     0.0% err
  notifications      degraded  0d 04h     retry 12
------------------------------------------------
  cpu 31%   mem 58%   disk 44%   net 12Mb/s
  last deploy: 2026-08-03 14:02 UTC (ok)
  on-call: platform-secondary
================================================"#;
