use eframe::egui::{self, Color32, CornerRadius, FontId, Frame, Margin, Stroke, TextStyle};
use sqlwriter::orchestrator::PanelState;
use sqlwriter::session::{Role, Turn};

#[derive(Debug, Clone)]
pub struct Theme {
    pub page_fill: Color32,
    pub panel_fill: Color32,
    pub editor_fill: Color32,
    pub border: Color32,
    pub accent: Color32,
    pub text_primary: Color32,
    pub text_muted: Color32,
    pub user_turn: Color32,
    pub assistant_turn: Color32,
    pub danger: Color32,
    pub success: Color32,
    pub spacing_8: f32,
    pub radius: u8,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            page_fill: Color32::from_rgb(0xFA, 0xFA, 0xFA),
            panel_fill: Color32::WHITE,
            editor_fill: Color32::from_rgb(0xF4, 0xF6, 0xF8),
            border: Color32::from_rgb(0xDD, 0xDD, 0xDD),
            accent: Color32::from_rgb(0x27, 0x6F, 0x90),
            text_primary: Color32::from_rgb(0x1F, 0x23, 0x28),
            text_muted: Color32::from_rgb(0x6A, 0x73, 0x7D),
            user_turn: Color32::from_rgb(0x1F, 0x23, 0x28),
            assistant_turn: Color32::from_rgb(0x27, 0x6F, 0x90),
            danger: Color32::from_rgb(0xC0, 0x39, 0x2B),
            success: Color32::from_rgb(0x2E, 0x7D, 0x32),
            spacing_8: 8.0,
            radius: 4,
        }
    }
}

impl Theme {
    pub fn apply_visuals(&self, ctx: &egui::Context) {
        let mut visuals = egui::Visuals::light();
        visuals.panel_fill = self.page_fill;
        visuals.override_text_color = Some(self.text_primary);
        visuals.extreme_bg_color = self.editor_fill;
        visuals.selection.bg_fill = self.accent.gamma_multiply(0.3);
        visuals.hyperlink_color = self.accent;
        visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, self.border);

        let mut style = (*ctx.style()).clone();
        style.visuals = visuals;
        style.spacing.item_spacing = egui::vec2(6.0, 6.0);
        style.spacing.button_padding = egui::vec2(10.0, 4.0);
        style.text_styles.insert(TextStyle::Heading, FontId::proportional(20.0));
        style.text_styles.insert(TextStyle::Body, FontId::proportional(14.0));
        style.text_styles.insert(TextStyle::Monospace, FontId::monospace(13.0));
        ctx.set_style(style);
    }

    /// Bordered box the assistant panel renders into.
    pub fn panel_frame(&self) -> Frame {
        Frame::new()
            .fill(self.panel_fill)
            .stroke(Stroke::new(1.0, self.border))
            .inner_margin(Margin::same(self.spacing_8 as i8))
            .corner_radius(CornerRadius::same(self.radius))
    }

    pub fn editor_frame(&self) -> Frame {
        Frame::new()
            .fill(self.editor_fill)
            .inner_margin(Margin::same(self.spacing_8 as i8))
            .corner_radius(CornerRadius::same(self.radius))
    }

    pub fn turn_color(&self, turn: &Turn) -> Color32 {
        if turn.is_error() {
            return self.danger;
        }
        match turn.role() {
            Role::User => self.user_turn,
            Role::Assistant => self.assistant_turn,
        }
    }

    pub fn state_label(&self, state: &PanelState) -> (String, Color32) {
        match state {
            PanelState::Idle => ("Idle".to_string(), self.text_muted),
            PanelState::Generating => ("Generating...".to_string(), self.accent),
            PanelState::Ready(_) => ("Query ready".to_string(), self.success),
            PanelState::Failed(message) => (format!("Failed: {message}"), self.danger),
        }
    }
}
