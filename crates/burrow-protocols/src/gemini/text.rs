//! Gemtext parser

use burrow_navigation::Url;
use serde::{Deserialize, Serialize};

/// What to show for preformatted blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockDisplay {
    /// Alt text placeholder and the block itself
    Both,
    /// Neither the alt text nor the block
    Neither,
    /// Only a placeholder carrying the alt text
    #[default]
    Alt,
    /// Only the block
    Block,
}

impl BlockDisplay {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "both" => Some(BlockDisplay::Both),
            "neither" => Some(BlockDisplay::Neither),
            "alt" => Some(BlockDisplay::Alt),
            "block" => Some(BlockDisplay::Block),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlockDisplay::Both => "both",
            BlockDisplay::Neither => "neither",
            BlockDisplay::Alt => "alt",
            BlockDisplay::Block => "block",
        }
    }

    fn shows_alt(&self) -> bool {
        matches!(self, BlockDisplay::Both | BlockDisplay::Alt)
    }

    fn shows_block(&self) -> bool {
        matches!(self, BlockDisplay::Both | BlockDisplay::Block)
    }
}

/// Turn gemtext into display text and absolute link targets
pub fn parse_gemtext(body: &str, location: &Url, blocks: BlockDisplay) -> (String, Vec<String>) {
    let mut lines = Vec::new();
    let mut links = Vec::new();
    let mut preformatted = false;

    for raw in body.split('\n') {
        let line = raw.trim_end_matches('\r');

        if let Some(alt) = line.strip_prefix("```") {
            if !preformatted && blocks.shows_alt() {
                let alt = alt.trim();
                if !alt.is_empty() {
                    lines.push(format!("[ALT][ {alt} ]"));
                }
            }
            preformatted = !preformatted;
            continue;
        }

        if preformatted {
            if blocks.shows_block() {
                lines.push(line.to_string());
            }
            continue;
        }

        if let Some((target, label)) = link_line(line) {
            links.push(location.resolve_relative(target));
            let number = format!("[{}]", links.len());
            lines.push(format!("{number:<5} {label}"));
            continue;
        }

        lines.push(line.to_string());
    }

    (lines.join("\n"), links)
}

/// Split `=> target [label]`; the label defaults to the target
fn link_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix("=>")?.trim();
    if rest.is_empty() {
        return None;
    }

    match rest.split_once(char::is_whitespace) {
        Some((target, label)) => {
            let label = label.trim();
            Some((target, if label.is_empty() { target } else { label }))
        }
        None => Some((rest, rest)),
    }
}
