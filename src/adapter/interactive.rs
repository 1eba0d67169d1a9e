//! Interactive parser adapter: transcript decoding
//!
//! A response from the interactive parser is a line stream with explicit
//! sections:
//!
//! ```text
//! Sentence #1 (3 tokens):
//! The dog barks.
//! [Text=The CharacterOffsetBegin=0 ... PartOfSpeech=DT Lemma=the NamedEntityTag=O] ...
//! (ROOT (S ...))            <- parse tree, until a blank line
//!
//! det(dog-2, The-1)         <- dependency tuples, until a blank line
//! nsubj(barks-3, dog-2)
//!
//! Coreference set:
//! (2,1,[1,2)) -> (1,2,[1,3)), that is: "He" -> "The dog"
//! ```
//!
//! Coreference groups are `(sentence,head,[start,end))` with 1-based token
//! positions and an exclusive end.

use super::error::{AdapterError, AdapterResult};
use super::features::{parse_feature_block, token_blocks};
use super::pos::penn_tag;
use super::session::InteractiveSession;
use super::traits::{Adapter, AdapterInput};
use crate::config::InteractiveConfig;
use crate::graph::{Document, NewTerm, SentenceId, SpanMember, TermId};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Stdio;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Line that ends the sentence section and opens each coreference set
pub const COREF_SENTINEL: &str = "Coreference set:";

static SENTENCE_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Sentence #\s*(\d+)").unwrap());
static TUPLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+)\(.+-([0-9']+), .+-([0-9']+)\)$").unwrap());
static COREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*\((\S+)\) -> \((\S+)\), that is: ".*" -> ".*"$"#).unwrap());

/// Token keys with a dedicated place in [`NewTerm`]; everything else goes to `extra`
const TEXT: &str = "Text";
const LEMMA: &str = "Lemma";
const POS: &str = "PartOfSpeech";
const OFFSET: &str = "CharacterOffsetBegin";
const ENTITY: &str = "NamedEntityTag";

/// One `(sentence,head,[start,end))` coreference group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CorefGroup {
    sentence: u32,
    head: usize,
    start: usize,
    end: usize,
}

impl CorefGroup {
    fn parse(raw: &str, line: &str) -> AdapterResult<Self> {
        let cleaned = raw.replace(['[', ')'], "");
        let parts: Vec<usize> = cleaned
            .split(',')
            .map(|p| p.trim().parse::<usize>())
            .collect::<Result<_, _>>()
            .map_err(|_| AdapterError::malformed(line, None, format!("bad coreference group {:?}", raw)))?;

        match parts.as_slice() {
            &[sentence, head, start, end] => Ok(Self {
                sentence: sentence as u32,
                head,
                start,
                end,
            }),
            _ => Err(AdapterError::malformed(
                line,
                None,
                format!("coreference group {:?} needs 4 numbers", raw),
            )),
        }
    }
}

/// Decode one complete transcript into `doc`.
pub fn parse_transcript<'a, I>(lines: I, doc: &mut Document) -> AdapterResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut lines = lines.into_iter();

    loop {
        let Some(header) = lines.by_ref().find(|l| !l.trim().is_empty()) else {
            return Ok(());
        };
        if header.trim() == COREF_SENTINEL {
            break;
        }
        let number = SENTENCE_HEADER
            .captures(header)
            .and_then(|c| c[1].parse::<u32>().ok())
            .ok_or_else(|| AdapterError::malformed(header, None, "expected a sentence header"))?;
        if number == 0 {
            return Err(AdapterError::malformed(header, None, "sentence number must be positive"));
        }
        parse_sentence(SentenceId(number), &mut lines, doc)?;
    }

    loop {
        let set = read_coref_set(&mut lines)?;
        if set.is_empty() {
            return Ok(());
        }
        apply_coref_set(doc, &set)?;
    }
}

fn parse_sentence<'a, I>(id: SentenceId, lines: &mut I, doc: &mut Document) -> AdapterResult<()>
where
    I: Iterator<Item = &'a str>,
{
    let truncated = || AdapterError::malformed("", Some(id), "transcript ended inside sentence");

    let text = lines.next().ok_or_else(truncated)?;
    debug!(sentence = %id, text, "parsing sentence");

    let sentence = doc.create_sentence(id);
    let token_line = lines.next().ok_or_else(truncated)?;
    let mut terms: Vec<TermId> = Vec::new();
    for block in token_blocks(token_line) {
        terms.push(add_token(doc, sentence, block)?);
    }

    // Parse tree: consumed, not kept
    for line in lines.by_ref() {
        if line.trim().is_empty() {
            break;
        }
    }

    for line in lines.by_ref() {
        if line.trim().is_empty() {
            break;
        }
        add_tuple(doc, id, &terms, line)?;
    }
    Ok(())
}

fn add_token(doc: &mut Document, sentence: SentenceId, block: &str) -> AdapterResult<TermId> {
    let mut word = None;
    let mut lemma = None;
    let mut tag = None;
    let mut offset = None;
    let mut extra = Vec::new();

    for (key, value) in parse_feature_block(block) {
        match key.as_str() {
            TEXT => word = Some(value),
            LEMMA => lemma = Some(value),
            POS => tag = Some(value),
            OFFSET => offset = Some(value),
            ENTITY if value == "O" => {}
            ENTITY => extra.push(("entity".to_string(), value)),
            _ => extra.push((key, value)),
        }
    }

    let missing = |key: &str| AdapterError::malformed(block, Some(sentence), format!("token without {}", key));
    let word = word.ok_or_else(|| missing(TEXT))?;
    let lemma = lemma.ok_or_else(|| missing(LEMMA))?;
    let tag = tag.ok_or_else(|| missing(POS))?;
    let offset = offset
        .ok_or_else(|| missing(OFFSET))?
        .parse::<i64>()
        .map_err(|_| AdapterError::malformed(block, Some(sentence), "offset is not a number"))?;

    let mut term = NewTerm::new(offset, word, lemma, penn_tag(&tag)?).with_extra("tag", tag);
    for (key, value) in extra {
        term = term.with_extra(key, value);
    }
    Ok(doc.add_term(sentence, term)?)
}

/// Resolve a 1-based tuple index; `None` for the ROOT pseudo-token.
///
/// A trailing `'` marks a copy node and refers to the same token.
fn tuple_term(terms: &[TermId], raw: &str, line: &str, sentence: SentenceId) -> AdapterResult<Option<TermId>> {
    let index = raw
        .trim_end_matches('\'')
        .parse::<usize>()
        .map_err(|_| AdapterError::malformed(line, Some(sentence), "bad token index"))?;
    if index == 0 {
        return Ok(None);
    }
    terms
        .get(index - 1)
        .copied()
        .map(Some)
        .ok_or_else(|| {
            AdapterError::malformed(
                line,
                Some(sentence),
                format!("token index {} beyond {} tokens", index, terms.len()),
            )
        })
}

fn add_tuple(doc: &mut Document, sentence: SentenceId, terms: &[TermId], line: &str) -> AdapterResult<()> {
    let caps = TUPLE
        .captures(line.trim())
        .ok_or_else(|| AdapterError::malformed(line, Some(sentence), "expected rel(word-i, word-j)"))?;

    let governor = tuple_term(terms, &caps[2], line, sentence)?;
    let dependent = tuple_term(terms, &caps[3], line, sentence)?;
    match (dependent, governor) {
        (Some(dependent), Some(governor)) => {
            doc.add_dependency(dependent, governor, &caps[1])?;
        }
        _ => debug!(sentence = %sentence, line, "skipping tuple attached to ROOT"),
    }
    Ok(())
}

/// Read lines up to the next sentinel (or end); each matched line yields two groups.
fn read_coref_set<'a, I>(lines: &mut I) -> AdapterResult<Vec<(CorefGroup, CorefGroup)>>
where
    I: Iterator<Item = &'a str>,
{
    let mut set = Vec::new();
    for line in lines.by_ref() {
        if line.trim() == COREF_SENTINEL {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        let caps = COREF
            .captures(line)
            .ok_or_else(|| AdapterError::malformed(line, None, "expected a coreference line"))?;
        set.push((CorefGroup::parse(&caps[1], line)?, CorefGroup::parse(&caps[2], line)?));
    }
    Ok(set)
}

fn apply_coref_set(doc: &mut Document, set: &[(CorefGroup, CorefGroup)]) -> AdapterResult<()> {
    // The representative mention repeats on every line of a set
    let mut groups: Vec<CorefGroup> = Vec::new();
    for group in set.iter().flat_map(|(a, b)| [*a, *b]) {
        if !groups.contains(&group) {
            groups.push(group);
        }
    }

    let chain = doc.create_coreference();
    for group in groups {
        let members = span_members(doc, &group)?;
        doc.add_span(chain, members)?;
    }
    Ok(())
}

fn span_members(doc: &Document, group: &CorefGroup) -> AdapterResult<Vec<SpanMember>> {
    let sentence = SentenceId(group.sentence);
    let describe = || {
        format!(
            "({},{},[{},{}))",
            group.sentence, group.head, group.start, group.end
        )
    };

    if doc.sentence(sentence).is_none() {
        return Err(AdapterError::malformed(describe(), None, "coreference to unknown sentence"));
    }
    let terms = doc.terms_of(sentence);
    if group.start == 0 || group.end <= group.start || group.end - 1 > terms.len() {
        return Err(AdapterError::malformed(
            describe(),
            Some(sentence),
            format!("span outside {} tokens", terms.len()),
        ));
    }
    if group.head < group.start || group.head >= group.end {
        return Err(AdapterError::malformed(describe(), Some(sentence), "span has no head"));
    }

    Ok((group.start..group.end)
        .map(|position| SpanMember::new(terms[position - 1].id, position == group.head))
        .collect())
}

struct Running {
    child: Child,
    session: InteractiveSession<ChildStdout, ChildStdin>,
}

/// Adapter holding one long-lived interactive parser process.
pub struct InteractiveParserAdapter {
    adapter_id: String,
    running: Mutex<Running>,
}

impl InteractiveParserAdapter {
    /// Launch the parser and wait until it reports ready.
    pub async fn spawn(config: InteractiveConfig) -> AdapterResult<Self> {
        info!(command = %config.command, "starting interactive parser");
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&config.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AdapterError::Startup("parser stdout not captured".to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AdapterError::Startup("parser stdin not captured".to_string()))?;

        let mut session = InteractiveSession::new(stdout, stdin, config);
        session.start().await?;

        Ok(Self {
            adapter_id: "interactive-parser".to_string(),
            running: Mutex::new(Running { child, session }),
        })
    }
}

#[async_trait]
impl Adapter for InteractiveParserAdapter {
    fn id(&self) -> &str {
        &self.adapter_id
    }

    async fn annotate(&self, input: &AdapterInput, doc: &mut Document) -> Result<(), AdapterError> {
        input.check_cancelled()?;
        let mut running = self.running.lock().await;
        let Running { child, session } = &mut *running;

        let transcript = tokio::select! {
            result = session.request(&input.text) => result?,
            _ = input.cancel.cancelled() => {
                warn!("interactive parse cancelled, stopping parser");
                child.start_kill()?;
                return Err(AdapterError::Cancelled);
            }
        };

        parse_transcript(transcript.iter().map(String::as_str), doc)?;
        info!(
            sentences = doc.sentences().len(),
            chains = doc.coreferences().len(),
            "interactive parse finished"
        );
        Ok(())
    }
}
