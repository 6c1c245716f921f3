pub mod ui_colors {
    use egui::Color32;

    pub const BACKGROUND_COLOR: Color32 = Color32::from_rgb(0x1B, 0x1D, 0x24);
    pub const EXTRA_BACKGROUND_COLOR: Color32 = Color32::from_rgb(0x2A, 0x2D, 0x37);
    pub const BG_STROKE_COLOR: Color32 = Color32::from_rgb(0x3A, 0x3E, 0x4B);
    pub const PRIMARY_COLOR: Color32 = Color32::from_rgb(0xD9, 0x73, 0x21);
    pub const LIGHT_PRIMARY_COLOR: Color32 = Color32::from_rgb(0xF0, 0x9A, 0x4E);
    pub const TEXT_COLOR: Color32 = Color32::from_rgb(0xE8, 0xE8, 0xEC);
    pub const MUTED_TEXT_COLOR: Color32 = Color32::from_rgb(0x8C, 0x90, 0x9C);
    pub const ERROR_COLOR: Color32 = Color32::from_rgb(0xE0, 0x5A, 0x5A);
}

pub const SECTION_SPACING: f32 = 25.0;
pub const BUTTON_WIDTH: f32 = 260.0;
pub const BUTTON_HEIGHT: f32 = 36.0;
