use crate::Color;

/// Candidate foreground colours for chat text.
///
/// Chat text colour depends on the channel (public, clan, friends, game
/// messages), and the capture does not say which one a line uses, so the
/// reader tries every colour listed here.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ChatPalette {
    pub colors: Vec<Color>,
}

impl ChatPalette {
    /// Player names and the chat input line.
    pub const NAME_BLUE: Color = Color::new(127, 169, 255);
    pub const WHITE: Color = Color::WHITE;
    pub const CLAN_GREEN: Color = Color::new(69, 178, 71);
    pub const FRIENDS_GOLD: Color = Color::new(215, 195, 119);
    pub const GUEST_CYAN: Color = Color::new(127, 255, 255);
    pub const GAME_RED: Color = Color::new(255, 82, 86);
    pub const BROADCAST_ORANGE: Color = Color::new(255, 140, 56);
    pub const TIMESTAMP_GREY: Color = Color::new(164, 153, 125);

    pub fn new(colors: Vec<Color>) -> Self {
        Self { colors }
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }
}

impl Default for ChatPalette {
    fn default() -> Self {
        Self {
            colors: vec![
                Self::WHITE,
                Self::NAME_BLUE,
                Self::CLAN_GREEN,
                Self::FRIENDS_GOLD,
                Self::GUEST_CYAN,
                Self::GAME_RED,
                Self::BROADCAST_ORANGE,
                Self::TIMESTAMP_GREY,
            ],
        }
    }
}
