use crate::error::{BpodError, Result};
use std::fmt;
use std::path::PathBuf;

/// Output path template with exactly one index placeholder.
///
/// Accepted placeholders: `{}`, `%d`, and zero-padded `%0Nd` (e.g. `mode_%03d.txt`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeTemplate {
    template: String,
    prefix: String,
    suffix: String,
    width: usize,
}

impl ModeTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let bytes = template.as_bytes();
        let mut found: Option<(usize, usize, usize)> = None;
        let mut record = |start: usize, end: usize, width: usize| -> Result<()> {
            if found.is_some() {
                return Err(BpodError::Configuration(format!(
                    "mode path template '{}' has more than one index placeholder",
                    template
                )));
            }
            found = Some((start, end, width));
            Ok(())
        };

        let mut i = 0;
        while i < bytes.len() {
            if bytes[i..].starts_with(b"{}") {
                record(i, i + 2, 0)?;
                i += 2;
                continue;
            }
            if bytes[i] == b'%' {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                if j < bytes.len() && bytes[j] == b'd' {
                    let width_spec = &template[i + 1..j];
                    let width = match width_spec {
                        "" => 0,
                        s if s.starts_with('0') => s.parse().map_err(|_| {
                            BpodError::Configuration(format!(
                                "placeholder width '%{}d' in '{}' is too large",
                                s, template
                            ))
                        })?,
                        _ => {
                            return Err(BpodError::Configuration(format!(
                                "unsupported placeholder '%{}d' in '{}', use %d or %0Nd",
                                width_spec, template
                            )))
                        }
                    };
                    record(i, j + 1, width)?;
                    i = j + 1;
                    continue;
                }
            }
            i += 1;
        }

        let (start, end, width) = found.ok_or_else(|| {
            BpodError::Configuration(format!(
                "mode path template '{}' has no index placeholder",
                template
            ))
        })?;
        Ok(Self {
            template: template.to_string(),
            prefix: template[..start].to_string(),
            suffix: template[end..].to_string(),
            width,
        })
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        PathBuf::from(format!(
            "{}{:0width$}{}",
            self.prefix,
            index,
            self.suffix,
            width = self.width
        ))
    }
}

impl fmt::Display for ModeTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}
