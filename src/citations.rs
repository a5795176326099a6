use regex::Regex;
use serde::Serialize;

/// A piece of narrative text: either plain text or an inline `[n]` marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Text { text: String },
    Citation { number: usize, active: bool },
}

/// Splits `text` on `[n]` markers, keeping the markers as their own segments.
/// A marker equal to `active` is flagged.
pub fn split_narrative(text: &str, active: Option<usize>) -> Vec<Segment> {
    let Ok(re) = Regex::new(r"\[(\d+)\]") else {
        return vec![Segment::Text {
            text: text.to_string(),
        }];
    };

    let mut segments = Vec::new();
    let mut pending = String::new();
    let mut last = 0;

    for captures in re.captures_iter(text) {
        let (Some(whole), Some(digits)) = (captures.get(0), captures.get(1)) else {
            continue;
        };

        pending.push_str(&text[last..whole.start()]);
        last = whole.end();

        match digits.as_str().parse::<usize>() {
            Ok(number) => {
                if !pending.is_empty() {
                    segments.push(Segment::Text {
                        text: std::mem::take(&mut pending),
                    });
                }
                segments.push(Segment::Citation {
                    number,
                    active: active == Some(number),
                });
            }
            // Too large to be a match position; keep it as prose.
            Err(_) => pending.push_str(whole.as_str()),
        }
    }

    pending.push_str(&text[last..]);
    if !pending.is_empty() {
        segments.push(Segment::Text { text: pending });
    }

    segments
}

/// Distinct citation numbers in order of first appearance.
pub fn cited_numbers(text: &str) -> Vec<usize> {
    let mut numbers = Vec::new();
    for segment in split_narrative(text, None) {
        if let Segment::Citation { number, .. } = segment {
            if !numbers.contains(&number) {
                numbers.push(number);
            }
        }
    }
    numbers
}
