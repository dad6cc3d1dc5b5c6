// Uses
use crate::{constants::NO_ROLLS_LINE, db::models::RollEntry};

/// The emoji shown beside each roll in the public results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
	/// The one and only highest roll.
	Crown,
	/// Shares the highest roll with someone else.
	Swords,
	/// The lowest roll, when there's more than one distinct value.
	Skull,
	Die,
}

impl Marker {
	pub fn emoji(self) -> &'static str {
		match self {
			Self::Crown => "\u{1f451}",
			Self::Swords => "\u{2694}\u{fe0f}",
			Self::Skull => "\u{1f480}",
			Self::Die => "\u{1f3b2}",
		}
	}
}

/// Pick a marker for each value, in the same order.
pub fn markers(values: &[i32]) -> Vec<Marker> {
	let (Some(&highest), Some(&lowest)) = (values.iter().max(), values.iter().min()) else {
		return Vec::new();
	};
	let tied_for_highest = values.iter().filter(|v| **v == highest).count() > 1;

	values
		.iter()
		.map(|&value| {
			if value == highest {
				if tied_for_highest {
					Marker::Swords
				} else {
					Marker::Crown
				}
			} else if value == lowest && lowest < highest && values.len() > 1 {
				Marker::Skull
			} else {
				Marker::Die
			}
		})
		.collect()
}

/// The public results text: one line per roll in arrival order.
pub fn render_results(entries: &[RollEntry]) -> String {
	if entries.is_empty() {
		return NO_ROLLS_LINE.to_owned();
	}

	let values = entries.iter().map(|e| e.value).collect::<Vec<_>>();
	entries
		.iter()
		.zip(markers(&values))
		.map(|(entry, marker)| {
			format!(
				"{} **{}** rolled **{}**",
				marker.emoji(),
				entry.display_name,
				entry.value
			)
		})
		.collect::<Vec<_>>()
		.join("\n")
}
