use configuration::LabelAnchor;
use serde::Serialize;

/// A sector code and the 1-based column position its label belongs at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelPosition {
    pub label: String,
    pub position: usize,
}

/// Groups column labels by their two-character prefix (the sector code in
/// `CODE` and `CODE...` style labels) and returns one axis position per
/// group, in first-seen order.
///
/// `Start` places a label at the group's first column; `Center` places it
/// halfway between the first column and `first + count - 1`.
pub fn label_positions(labels: &[String], anchor: LabelAnchor) -> Vec<LabelPosition> {
    // (prefix, first position, occurrences)
    let mut groups: Vec<(String, usize, usize)> = Vec::new();

    for (i, label) in labels.iter().enumerate() {
        let prefix: String = label.chars().take(2).collect();
        let position = i + 1;
        match groups.iter_mut().find(|(p, _, _)| *p == prefix) {
            Some((_, _, count)) => *count += 1,
            None => groups.push((prefix, position, 1)),
        }
    }

    groups
        .into_iter()
        .map(|(label, first, count)| LabelPosition {
            label,
            position: match anchor {
                LabelAnchor::Start => first,
                LabelAnchor::Center => (first + first + count - 1) / 2,
            },
        })
        .collect()
}
