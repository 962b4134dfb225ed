//! A small reader for delimiter separated records, one per line, with
//! optional double-quoted fields (`""` escapes a quote inside them).

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: unterminated quoted field")]
    UnterminatedQuote { line: usize },
    #[error("line {line}: stray quote in field")]
    StrayQuote { line: usize },
    #[error("output is not valid utf-8")]
    Encoding,
}

pub struct Reader {
    delimiter: char,
    trim_leading_space: bool,
}

impl Reader {
    pub fn new(delimiter: char) -> Self {
        Self {
            delimiter,
            trim_leading_space: false,
        }
    }

    /// Ignore whitespace at the start of every field.
    pub fn trim_leading_space(mut self, trim: bool) -> Self {
        self.trim_leading_space = trim;
        self
    }

    /// Reads every record. Blank lines are skipped and all records must
    /// have the same number of fields as the first.
    pub fn read_all(&self, input: &str) -> Result<Vec<Vec<String>>, TableError> {
        let mut records: Vec<Vec<String>> = Vec::new();

        for (index, line) in input.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let line_number = index + 1;
            let record = self.read_record(line, line_number)?;

            if let Some(first) = records.first() {
                if first.len() != record.len() {
                    return Err(TableError::FieldCount {
                        line: line_number,
                        expected: first.len(),
                        found: record.len(),
                    });
                }
            }

            records.push(record);
        }

        Ok(records)
    }

    fn read_record(&self, line: &str, line_number: usize) -> Result<Vec<String>, TableError> {
        let mut fields = Vec::new();
        let mut rest = line;

        loop {
            if self.trim_leading_space {
                rest = rest.trim_start_matches(|c: char| c != self.delimiter && c.is_whitespace());
            }

            if let Some(quoted) = rest.strip_prefix('"') {
                let (field, remainder) = unquote(quoted)
                    .ok_or(TableError::UnterminatedQuote { line: line_number })?;

                fields.push(field);

                match remainder.strip_prefix(self.delimiter) {
                    Some(next) => rest = next,
                    None if remainder.is_empty() => break,
                    None => return Err(TableError::StrayQuote { line: line_number }),
                }
            } else {
                let (field, next) = match rest.split_once(self.delimiter) {
                    Some((field, next)) => (field, Some(next)),
                    None => (rest, None),
                };

                if field.contains('"') {
                    return Err(TableError::StrayQuote { line: line_number });
                }

                fields.push(field.to_string());

                match next {
                    Some(next) => rest = next,
                    None => break,
                }
            }
        }

        Ok(fields)
    }
}

// returns the field content and whatever follows the closing quote
fn unquote(input: &str) -> Option<(String, &str)> {
    let mut field = String::new();
    let mut chars = input.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if c != '"' {
            field.push(c);
            continue;
        }

        if matches!(chars.peek(), Some((_, '"'))) {
            field.push('"');
            chars.next();
        } else {
            return Some((field, &input[index + 1..]));
        }
    }

    None
}
