use std::str::FromStr;

use crate::error::ConversionError;

/// One generic resource advertised by a node, e.g. `gpu:a100:2(S:0-1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gres {
    pub kind: String,

    /// Model name, `None` for untyped tokens such as `gpu:2`.
    pub name: Option<String>,
    pub count: u32,
}

impl Gres {
    pub fn is_gpu(&self) -> bool {
        self.kind == "gpu"
    }

    /// GPUs of this token usable for a request for `gpu_type` (any model if `None`).
    pub fn gpus_matching(&self, gpu_type: Option<&str>) -> u32 {
        if !self.is_gpu() {
            return 0;
        }

        match gpu_type {
            None => self.count,
            Some(requested) if self.name.as_deref() == Some(requested) => self.count,
            Some(_) => 0,
        }
    }
}

impl FromStr for Gres {
    type Err = ConversionError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        // Drop the socket binding suffix: "gpu:a100:2(S:0-1)" -> "gpu:a100:2"
        let bare = token.split('(').next().unwrap_or(token).trim();
        let parts: Vec<&str> = bare.split(':').collect();

        let (kind, name, count) = match parts.as_slice() {
            [kind, name, count] => (*kind, Some(name.to_string()), *count),
            [kind, count] => (*kind, None, *count),
            [kind] => (*kind, None, "1"),
            _ => return Err(ConversionError::MalformedGres(token.to_string())),
        };

        if kind.is_empty() {
            return Err(ConversionError::MalformedGres(token.to_string()));
        }

        let count = count.parse::<u32>().map_err(|_| ConversionError::MalformedGres(token.to_string()))?;

        Ok(Gres { kind: kind.to_string(), name, count })
    }
}

/// Parses a comma separated GRES string as reported by `sinfo`. Malformed tokens are logged and
/// skipped; an empty string or `(null)` yields no resources.
pub fn parse_gres_list(gres: &str) -> Vec<Gres> {
    let trimmed = gres.trim();
    if trimmed.is_empty() || trimmed == "(null)" {
        return Vec::new();
    }

    let mut resources = Vec::new();
    let mut depth = 0usize;
    let mut token_start = 0usize;

    // Commas inside the parenthesized suffix belong to the token, e.g. "gpu:a100:4(S:0,1)".
    for (index, ch) in trimmed.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                push_token(&trimmed[token_start..index], &mut resources);
                token_start = index + 1;
            }
            _ => {}
        }
    }
    push_token(&trimmed[token_start..], &mut resources);

    resources
}

fn push_token(token: &str, resources: &mut Vec<Gres>) {
    if token.trim().is_empty() {
        return;
    }

    match token.parse::<Gres>() {
        Ok(gres) => resources.push(gres),
        Err(e) => log::warn!("Skipping generic resource: {}", e),
    }
}
