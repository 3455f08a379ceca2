//! Batch text format: `batch_v1`
//!
//! The conversational-bot layer accepts batches as plain text, one operation
//! per line:
//!
//! ```text
//! # comment
//! + 茹果 rjgl phrase w=105   # create (type defaults to phrase)
//! - 如果 rjgl                # delete
//! ~ 如果>茹果 rjgl           # change (rename old>new under a code)
//! ```
//!
//! Malformed lines are hard errors with line numbers — a batch with an
//! unparseable operation is rejected wholesale, never partially decoded.

use crate::entry::EntryType;
use crate::op::PendingOperation;
use crate::{Code, ModelError};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, char as pchar, digit1, multispace1},
    combinator::{all_consuming, map_res, opt, recognize, rest},
    sequence::{pair, preceded},
    IResult,
};
use std::str::FromStr;

// ============================================================================
// Parsing
// ============================================================================

/// Parse a whole batch text into operations, in line order.
pub fn parse_batch_v1(input: &str) -> Result<Vec<PendingOperation>, ModelError> {
    let mut ops = Vec::new();
    for (idx, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let op = parse_op_line(line).map_err(|message| ModelError::BatchText {
            line: idx + 1,
            message,
        })?;
        ops.push(op);
    }
    Ok(ops)
}

fn parse_op_line(line: &str) -> Result<PendingOperation, String> {
    match all_consuming(op_line)(line) {
        Ok((_, op)) => Ok(op),
        Err(_) => Err(format!("unrecognized operation line `{line}`")),
    }
}

fn op_line(input: &str) -> IResult<&str, PendingOperation> {
    alt((create_line, delete_line, change_line))(input)
}

fn create_line(input: &str) -> IResult<&str, PendingOperation> {
    let (input, _) = pchar('+')(input)?;
    let (input, word) = preceded(multispace1, token)(input)?;
    let (input, code) = preceded(multispace1, code_token)(input)?;
    let (input, entry_type) = opt(preceded(multispace1, type_token))(input)?;
    let (input, weight) = opt(preceded(multispace1, weight_field))(input)?;
    let (input, remark) = opt(preceded(multispace1, remark_field))(input)?;
    let remark = remark.flatten();

    Ok((
        input,
        PendingOperation::Create {
            word: word.to_string(),
            code,
            entry_type: entry_type.unwrap_or(EntryType::Phrase),
            weight,
            remark,
        },
    ))
}

fn delete_line(input: &str) -> IResult<&str, PendingOperation> {
    let (input, _) = pchar('-')(input)?;
    let (input, word) = preceded(multispace1, token)(input)?;
    let (input, code) = preceded(multispace1, code_token)(input)?;
    let (input, entry_type) = opt(preceded(multispace1, type_token))(input)?;
    let (input, remark) = opt(preceded(multispace1, remark_field))(input)?;
    let remark = remark.flatten();

    Ok((
        input,
        PendingOperation::Delete {
            word: word.to_string(),
            code,
            entry_type: entry_type.unwrap_or(EntryType::Phrase),
            remark,
        },
    ))
}

fn change_line(input: &str) -> IResult<&str, PendingOperation> {
    let (input, _) = pchar('~')(input)?;
    let (input, old_word) = preceded(multispace1, token)(input)?;
    let (input, _) = pchar('>')(input)?;
    let (input, word) = token(input)?;
    let (input, code) = preceded(multispace1, code_token)(input)?;
    let (input, entry_type) = opt(preceded(multispace1, type_token))(input)?;
    let (input, weight) = opt(preceded(multispace1, weight_field))(input)?;
    let (input, remark) = opt(preceded(multispace1, remark_field))(input)?;
    let remark = remark.flatten();

    Ok((
        input,
        PendingOperation::Change {
            old_word: old_word.to_string(),
            word: word.to_string(),
            code,
            entry_type: entry_type.unwrap_or(EntryType::Phrase),
            weight,
            remark,
        },
    ))
}

/// A bare token: anything up to whitespace, `>` (the change separator) or
/// `#` (the remark separator).
fn token(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace() && c != '>' && c != '#')(input)
}

fn code_token(input: &str) -> IResult<&str, Code> {
    map_res(token, Code::new)(input)
}

fn type_token(input: &str) -> IResult<&str, EntryType> {
    map_res(alpha1, EntryType::from_str)(input)
}

fn weight_field(input: &str) -> IResult<&str, i64> {
    preceded(
        tag("w="),
        map_res(recognize(pair(opt(pchar('-')), digit1)), str::parse::<i64>),
    )(input)
}

fn remark_field(input: &str) -> IResult<&str, Option<String>> {
    let (input, text) = preceded(pchar('#'), rest)(input)?;
    let text = text.trim();
    Ok((
        input,
        (!text.is_empty()).then(|| text.to_string()),
    ))
}

// ============================================================================
// Rendering
// ============================================================================

/// Render operations back into `batch_v1` text (one line per operation).
pub fn render_batch_v1(ops: &[PendingOperation]) -> String {
    let mut out = String::new();
    for op in ops {
        match op {
            PendingOperation::Create {
                word,
                code,
                entry_type,
                weight,
                remark,
            } => {
                out.push_str(&format!("+ {word} {code} {entry_type}"));
                if let Some(w) = weight {
                    out.push_str(&format!(" w={w}"));
                }
                push_remark(&mut out, remark.as_deref());
            }
            PendingOperation::Change {
                old_word,
                word,
                code,
                entry_type,
                weight,
                remark,
            } => {
                out.push_str(&format!("~ {old_word}>{word} {code} {entry_type}"));
                if let Some(w) = weight {
                    out.push_str(&format!(" w={w}"));
                }
                push_remark(&mut out, remark.as_deref());
            }
            PendingOperation::Delete {
                word,
                code,
                entry_type,
                remark,
            } => {
                out.push_str(&format!("- {word} {code} {entry_type}"));
                push_remark(&mut out, remark.as_deref());
            }
        }
        out.push('\n');
    }
    out
}

fn push_remark(out: &mut String, remark: Option<&str>) {
    if let Some(remark) = remark {
        out.push_str(&format!(" # {remark}"));
    }
}
