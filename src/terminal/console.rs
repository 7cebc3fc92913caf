use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tokio::sync::Mutex;
use tracing::warn;

type Input = Lines<Box<dyn AsyncBufRead + Send + Unpin>>;
type Output = Box<dyn AsyncWrite + Send + Unpin>;

/// Line-oriented terminal shared by the wizard, the MFA prompt and the
/// navigator.
pub struct Console {
    input: Mutex<Input>,
    output: Mutex<Output>,
}

impl Console {
    pub fn new(
        input: impl AsyncBufRead + Send + Unpin + 'static,
        output: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        let input: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(input);
        Self {
            input: Mutex::new(input.lines()),
            output: Mutex::new(Box::new(output)),
        }
    }

    pub fn stdio() -> Self {
        Self::new(io::BufReader::new(io::stdin()), io::stdout())
    }

    /// Print one line. Write failures are logged, not returned.
    pub async fn say(&self, text: impl AsRef<str>) {
        let mut output = self.output.lock().await;
        let result = async {
            output.write_all(text.as_ref().as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await
        }
        .await;
        if let Err(err) = result {
            warn!(error = %err, "terminal write failed");
        }
    }

    /// Show `prompt` and read one trimmed line. `None` at end of input.
    pub async fn ask(&self, prompt: &str) -> Option<String> {
        {
            let mut output = self.output.lock().await;
            let result = async {
                output.write_all(prompt.as_bytes()).await?;
                output.write_all(b" ").await?;
                output.flush().await
            }
            .await;
            if let Err(err) = result {
                warn!(error = %err, "terminal write failed");
            }
        }
        match self.input.lock().await.next_line().await {
            Ok(line) => line.map(|line| line.trim().to_string()),
            Err(err) => {
                warn!(error = %err, "terminal read failed");
                None
            }
        }
    }

    /// Like [`Console::ask`], returning `default` for an empty answer.
    pub async fn ask_or(&self, prompt: &str, default: &str) -> Option<String> {
        let answer = self.ask(&format!("{prompt} [{default}]:")).await?;
        Some(if answer.is_empty() {
            default.to_string()
        } else {
            answer
        })
    }
}
