use std::io::{self, Write};

/// Destination of `print`/`println`: the process stdout, or a buffer for
/// tests and embedding.
#[derive(Debug, Default)]
pub enum Output {
    #[default]
    Stdout,
    Buffer(String),
}

impl Output {
    pub fn buffer() -> Self {
        Output::Buffer(String::new())
    }

    pub fn print(&mut self, msg: &str) -> io::Result<()> {
        match self {
            Output::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(msg.as_bytes())?;
                out.flush()
            }
            Output::Buffer(buf) => {
                buf.push_str(msg);
                Ok(())
            }
        }
    }

    /// Everything printed so far; empty for stdout.
    pub fn captured(&self) -> &str {
        match self {
            Output::Stdout => "",
            Output::Buffer(buf) => buf,
        }
    }
}
