//! Streaming dependency adapter
//!
//! Feeds raw text to a long-running parser pipeline and reads back one
//! dependency per line:
//!
//! ```text
//! lemma|word|begin|end|_|_|tag|func/rel|lemma|word|begin|end|_|_|tag|sentence
//! ```
//!
//! A listener task drains the pipeline's stdout while the calling task
//! writes stdin, so neither side can stall on a full pipe. The listener
//! only parses; the caller applies the parsed lines to the document after
//! joining it.

use super::error::{AdapterError, AdapterResult};
use super::pos::{category_tag, CategoryTag};
use super::traits::{Adapter, AdapterInput};
use crate::config::StreamingConfig;
use crate::graph::{Document, NewTerm, SentenceId, TermId};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

const FIELD_COUNT: usize = 16;

/// One token as described by seven consecutive fields
#[derive(Debug, Clone, PartialEq)]
pub struct TokenFields {
    pub lemma: String,
    pub word: String,
    pub begin: i64,
    pub end: i64,
    pub tag: CategoryTag,
}

/// One decoded dependency line
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyLine {
    pub sentence: SentenceId,
    /// Token in the first field group; the dependent
    pub first: TokenFields,
    /// Token in the second field group; the governor
    pub second: TokenFields,
    pub function: String,
    pub relation: String,
}

impl DependencyLine {
    pub fn parse(line: &str) -> AdapterResult<Self> {
        let fields: Vec<&str> = line.trim().split('|').collect();
        if fields.len() != FIELD_COUNT {
            return Err(AdapterError::malformed(
                line,
                None,
                format!("has {} fields (needed {})", fields.len(), FIELD_COUNT),
            ));
        }

        let sentence = fields[FIELD_COUNT - 1]
            .parse::<u32>()
            .ok()
            .filter(|&n| n > 0)
            .map(SentenceId)
            .ok_or_else(|| AdapterError::malformed(line, None, "sentence id is not a positive integer"))?;

        let (function, relation) = fields[7].split_once('/').ok_or_else(|| {
            AdapterError::malformed(line, Some(sentence), "relation field is not func/rel")
        })?;

        Ok(Self {
            sentence,
            first: token_fields(line, sentence, &fields[0..7])?,
            second: token_fields(line, sentence, &fields[8..15])?,
            function: function.to_string(),
            relation: relation.to_string(),
        })
    }
}

fn token_fields(line: &str, sentence: SentenceId, fields: &[&str]) -> AdapterResult<TokenFields> {
    let offset = |raw: &str, what: &str| {
        raw.parse::<i64>().map_err(|_| {
            AdapterError::malformed(line, Some(sentence), format!("{} offset {:?} is not a number", what, raw))
        })
    };

    Ok(TokenFields {
        lemma: fields[0].to_string(),
        word: fields[1].to_string(),
        begin: offset(fields[2], "begin")?,
        end: offset(fields[3], "end")?,
        tag: category_tag(fields[6])?,
    })
}

fn add_token(doc: &mut Document, sentence: SentenceId, token: &TokenFields) -> AdapterResult<TermId> {
    let mut term = NewTerm::new(token.begin, &token.word, &token.lemma, token.tag.pos)
        .with_extra("major", &token.tag.major);
    if let Some(minor) = &token.tag.minor {
        term = term.with_extra("minor", minor);
    }
    Ok(doc.add_term(sentence, term)?)
}

/// Write one parsed line into the document.
pub fn apply_line(doc: &mut Document, line: &DependencyLine) -> AdapterResult<()> {
    let sentence = doc.create_sentence(line.sentence);
    let dependent = add_token(doc, sentence, &line.first)?;
    let governor = add_token(doc, sentence, &line.second)?;
    doc.add_dependency(dependent, governor, &line.relation)?;
    Ok(())
}

/// Listener body: decode lines until end of stream.
///
/// Blank lines are skipped; any other line must decode or the whole read fails.
pub async fn read_lines<R>(reader: R) -> AdapterResult<Vec<DependencyLine>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut parsed = Vec::new();
    let mut current: Option<SentenceId> = None;

    while let Some(raw) = lines.next_line().await? {
        if raw.trim().is_empty() {
            continue;
        }
        let line = DependencyLine::parse(&raw).map_err(|e| {
            error!(line = %raw, error = %e, "cannot parse dependency line");
            e
        })?;
        if current != Some(line.sentence) {
            debug!(sentence = %line.sentence, "dependency output for new sentence");
            current = Some(line.sentence);
        }
        parsed.push(line);
    }

    Ok(parsed)
}

/// Parse a complete dependency stream (e.g. a saved parser run) into `doc`.
pub async fn parse_stream<R>(
    reader: R,
    doc: &mut Document,
    input: &AdapterInput,
) -> AdapterResult<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(raw) = lines.next_line().await? {
        input.check_cancelled()?;
        if raw.trim().is_empty() {
            continue;
        }
        apply_line(doc, &DependencyLine::parse(&raw)?)?;
    }
    Ok(())
}

/// Adapter driving the streaming dependency parser subprocess.
pub struct StreamingDependencyAdapter {
    adapter_id: String,
    config: StreamingConfig,
}

impl StreamingDependencyAdapter {
    pub fn new(config: StreamingConfig) -> Self {
        Self {
            adapter_id: "streaming-dependencies".to_string(),
            config,
        }
    }
}

#[async_trait]
impl Adapter for StreamingDependencyAdapter {
    fn id(&self) -> &str {
        &self.adapter_id
    }

    async fn annotate(&self, input: &AdapterInput, doc: &mut Document) -> Result<(), AdapterError> {
        input.check_cancelled()?;
        info!(command = %self.config.command, "starting dependency parser");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.config.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AdapterError::Startup("parser stdout not captured".to_string()))?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AdapterError::Startup("parser stdin not captured".to_string()))?;

        let listener = tokio::spawn(read_lines(BufReader::new(stdout)));
        let listener_abort = listener.abort_handle();

        let text = input.text.clone();
        let exchange = async move {
            let written = async {
                stdin.write_all(text.as_bytes()).await?;
                stdin.shutdown().await
            }
            .await;
            drop(stdin);

            let parsed = listener
                .await
                .map_err(|e| AdapterError::Internal(format!("listener task failed: {}", e)))??;
            // A listener error explains a broken pipe better than the pipe error itself.
            written?;
            Ok::<_, AdapterError>(parsed)
        };

        let parsed = tokio::select! {
            result = exchange => result?,
            _ = input.cancel.cancelled() => {
                warn!("dependency parsing cancelled, killing parser");
                listener_abort.abort();
                child.start_kill()?;
                return Err(AdapterError::Cancelled);
            }
        };

        let status = child.wait().await?;
        if !status.success() {
            error!(%status, "dependency parser exited unsuccessfully");
            return Err(AdapterError::ToolFailed {
                tool: "dependency parser".to_string(),
                status,
            });
        }

        for line in &parsed {
            apply_line(doc, line)?;
        }
        info!(lines = parsed.len(), sentences = doc.sentences().len(), "dependency parsing finished");
        Ok(())
    }
}
