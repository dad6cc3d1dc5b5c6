// Modules
mod roll_button;
mod util;

// Uses
use poise::Command;

use self::{roll_button::*, util::*};
use crate::{DataArc, Error};

/// The list of commands supported by the bot.
pub fn commands() -> Vec<Command<DataArc, Error>> {
	vec![roll_button(), help(), ping()]
}
