// Types de commandes - Tick thread → audio callback

use crate::sequencer::ClickType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickCommand {
    /// Start a click from the top
    Play(ClickType),
    /// Cut the click that is sounding (sent when a run ends)
    Silence,
}
