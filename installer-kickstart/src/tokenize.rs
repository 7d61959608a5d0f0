// SPDX-License-Identifier: GPL-3.0-only

//! Kickstart tokenizer: comment stripping, quote-aware word splitting and
//! section capture.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("unterminated quote")]
    UnterminatedQuote,

    #[error("section %{0} is missing its %end")]
    UnterminatedSection(String),

    #[error("%end outside of a section")]
    StrayEnd,
}

/// One command line of a kickstart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub line_number: u32,
    pub tokens: Vec<String>,
}

/// One `%name ... %end` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub line_number: u32,
    pub name: String,
    pub header_tokens: Vec<String>,
    pub body: Vec<String>,
}

/// A tokenized kickstart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedScript {
    pub commands: Vec<CommandLine>,
    pub sections: Vec<Section>,
}

/// Split one line into words, honoring single and double quotes.
pub fn split_words(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                } else {
                    current.push(ch);
                }
            }
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    in_word = true;
                }
                c if c.is_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                '#' if !in_word => break,
                c => {
                    current.push(c);
                    in_word = true;
                }
            },
        }
    }
    if quote.is_some() {
        return Err(TokenizeError::UnterminatedQuote);
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Tokenize a whole script. Line numbers count from 1.
pub fn tokenize(source: &str) -> Result<TokenizedScript, (TokenizeError, u32)> {
    let mut script = TokenizedScript::default();
    let mut section: Option<Section> = None;

    for (index, raw) in source.lines().enumerate() {
        let line_number = index as u32 + 1;

        if let Some(open) = section.as_mut() {
            let trimmed = raw.trim();
            if trimmed == "%end" {
                script.sections.push(section.take().expect("open section"));
            } else {
                open.body.push(raw.to_string());
            }
            continue;
        }

        let words = split_words(raw).map_err(|error| (error, line_number))?;
        let Some(first) = words.first() else {
            continue;
        };

        if first == "%end" {
            return Err((TokenizeError::StrayEnd, line_number));
        }
        if let Some(name) = first.strip_prefix('%') {
            section = Some(Section {
                line_number,
                name: name.to_string(),
                header_tokens: words[1..].to_vec(),
                body: Vec::new(),
            });
            continue;
        }

        script.commands.push(CommandLine {
            line_number,
            tokens: words,
        });
    }

    if let Some(open) = section {
        return Err((
            TokenizeError::UnterminatedSection(open.name),
            open.line_number,
        ));
    }
    Ok(script)
}
