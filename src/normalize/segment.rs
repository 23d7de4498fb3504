use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use tracing::debug;

use crate::error::{HarvestError, Result};

/// Word segmentation service.
/// Returns the input re-spaced into tokens; multi-word expressions may be fused
/// into one token whose words are joined by `_`.
pub trait Segmenter: Send + Sync {
    fn segment(&self, text: &str) -> io::Result<String>;
}

/// Every whitespace-separated word is a token.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceSegmenter;

impl Segmenter for WhitespaceSegmenter {
    fn segment(&self, text: &str) -> io::Result<String> {
        Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

/// Greedy longest-match segmentation against a lexicon of compounds.
///
/// Lexicon entries are multi-word expressions written with spaces (`kinh tế`).
/// Words already joined by `_` are passed through untouched.
#[derive(Debug, Clone)]
pub struct LexiconSegmenter {
    compounds: HashSet<String>,
    max_words: usize,
    joiner: char,
}

impl LexiconSegmenter {
    pub fn new<I, T>(entries: I, joiner: char) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut compounds = HashSet::new();
        let mut max_words = 1;
        for entry in entries {
            let words: Vec<String> = entry
                .as_ref()
                .split_whitespace()
                .map(|w| w.to_lowercase())
                .collect();
            if words.len() < 2 {
                continue;
            }
            max_words = max_words.max(words.len());
            compounds.insert(words.join(" "));
        }
        Self {
            compounds,
            max_words,
            joiner,
        }
    }

    /// Load a lexicon file, one compound per line.
    pub fn from_file(path: impl AsRef<Path>, joiner: char) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(HarvestError::missing(path));
        }
        let text = fs::read_to_string(path)?;
        Ok(Self::new(text.lines(), joiner))
    }

    pub fn len(&self) -> usize {
        self.compounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty()
    }
}

impl Segmenter for LexiconSegmenter {
    fn segment(&self, text: &str) -> io::Result<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut out: Vec<String> = Vec::with_capacity(words.len());
        let mut i = 0;
        'outer: while i < words.len() {
            let longest = self.max_words.min(words.len() - i);
            for len in (2..=longest).rev() {
                let candidate = words[i..i + len].join(" ");
                if self.compounds.contains(&candidate) {
                    out.push(candidate.replace(' ', &self.joiner.to_string()));
                    i += len;
                    continue 'outer;
                }
            }
            out.push(words[i].to_string());
            i += 1;
        }
        Ok(out.join(" "))
    }
}

/// Upper bound for one call of the external program.
/// Larger inputs are split on whitespace boundaries.
const COMMAND_CHUNK_BYTE_LIMIT: usize = 40_000;

/// Pipes text through an external segmentation program (stdin → stdout).
#[derive(Debug, Clone)]
pub struct CommandSegmenter {
    program: String,
    args: Vec<String>,
}

impl CommandSegmenter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn segment_once(&self, text: &str) -> io::Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // 出力を読みながら書き込まないとパイプが詰まるので別スレッドで送る
        let writer = child.stdin.take().map(|mut stdin| {
            let input = text.as_bytes().to_vec();
            thread::spawn(move || stdin.write_all(&input))
        });

        // stdout と stderr を同時に読み切ってから回収する
        let output = child.wait_with_output()?;
        let written = match writer {
            Some(handle) => handle
                .join()
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "segmenter stdin writer panicked"))?,
            None => Ok(()),
        };
        // 異常終了の方が書き込み失敗 (BrokenPipe) より原因に近い
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} exited with {:?}: {}", self.program, output.status.code(), stderr.trim()),
            ));
        }
        written?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

impl Segmenter for CommandSegmenter {
    fn segment(&self, text: &str) -> io::Result<String> {
        let chunks = split_into_chunks(text, COMMAND_CHUNK_BYTE_LIMIT);
        debug!(program = %self.program, chunks = chunks.len(), "segmenting");
        let mut parts = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let part = self.segment_once(chunk)?;
            if !part.is_empty() {
                parts.push(part);
            }
        }
        Ok(parts.join(" "))
    }
}

/// Split `text` into pieces of at most `limit` bytes, cutting at whitespace.
/// A single word longer than `limit` is cut at a UTF-8 char boundary.
fn split_into_chunks(text: &str, limit: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text.trim();
    while rest.len() > limit {
        let mut cut = floor_char_boundary(rest, limit);
        if let Some(space) = rest[..cut].rfind(char::is_whitespace) {
            if space > 0 {
                cut = space;
            }
        }
        if cut == 0 {
            // 1 文字すら入らない limit
            cut = rest.chars().next().map(char::len_utf8).unwrap_or(rest.len());
        }
        chunks.push(rest[..cut].trim_end());
        rest = rest[cut..].trim_start();
    }
    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut cut = index.min(text.len());
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    cut
}
