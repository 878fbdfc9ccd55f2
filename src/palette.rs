//! Node colors used during playback

/// RGBA color, components in `0.0..=1.0`
pub type Color = [f32; 4];

/// Fixed node colors
pub mod colors {
    use super::Color;

    /// Resting nodes: Steel blue (#4682B4)
    pub const NEUTRAL: Color = [0.275, 0.510, 0.706, 1.0];

    /// Cascade-activated nodes: Red (#FF0000)
    pub const PROPAGATED: Color = [1.0, 0.0, 0.0, 1.0];

    /// classic_greedy: Hot pink (rgb 255,105,180)
    pub const CLASSIC_GREEDY: Color = [1.0, 0.412, 0.706, 1.0];

    /// random_selection: Lime green (rgb 50,205,50)
    pub const RANDOM_SELECTION: Color = [0.196, 0.804, 0.196, 1.0];

    /// degree_heuristic: Purple (rgb 79,15,206)
    pub const DEGREE_HEURISTIC: Color = [0.310, 0.059, 0.808, 1.0];

    /// centrality_heuristic: Gold (rgb 255,215,0)
    pub const CENTRALITY_HEURISTIC: Color = [1.0, 0.843, 0.0, 1.0];

    /// celf: Turquoise (rgb 19,192,169)
    pub const CELF: Color = [0.075, 0.753, 0.663, 1.0];

    /// Alpha of the dim half of a sparkle
    pub const SPARKLE_DIM_ALPHA: f32 = 0.3;
}

/// Algorithm color lookup; `None` for unknown algorithms
pub fn color_for(algorithm: &str) -> Option<Color> {
    match algorithm {
        "classic_greedy" => Some(colors::CLASSIC_GREEDY),
        "random_selection" => Some(colors::RANDOM_SELECTION),
        "degree_heuristic" => Some(colors::DEGREE_HEURISTIC),
        "centrality_heuristic" => Some(colors::CENTRALITY_HEURISTIC),
        "celf" => Some(colors::CELF),
        _ => None,
    }
}

/// Same color with a different alpha
pub fn with_alpha(color: Color, alpha: f32) -> Color {
    [color[0], color[1], color[2], alpha]
}

/// CSS `rgba(...)` form, for logs and host UIs
pub fn to_css(color: Color) -> String {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "rgba({}, {}, {}, {})",
        channel(color[0]),
        channel(color[1]),
        channel(color[2]),
        color[3]
    )
}
