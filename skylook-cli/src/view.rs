//! Text rendering of the app state: the terminal's take on the single-page view.

use std::fmt;

use skylook_core::{
    App,
    display::{render_error, render_weather, theme_toggle_label},
};

pub fn render(app: &App) -> String {
    Screen(app).to_string()
}

struct Screen<'a>(&'a App);

impl fmt::Display for Screen<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.state();
        let map = self.0.map();

        writeln!(f, "theme: {} ({})", state.theme(), theme_toggle_label(state.theme()))?;

        if let Some(banner) = render_error(state) {
            writeln!(f, "{banner}")?;
        }

        match render_weather(state) {
            Some(panel) => writeln!(f, "{panel}")?,
            None if !state.credential_validated() && state.error().is_none() => {
                writeln!(f, "Validating API key...")?
            }
            None => {}
        }

        writeln!(f, "map: center {} zoom {}", map.center(), map.zoom())?;
        if let Some(marker) = map.marker() {
            writeln!(f, "  marker {marker}")?;
        }
        writeln!(f, "  tile {}", map.center_tile_url())?;
        writeln!(f, "  open {}", map.share_link())?;
        write!(f, "  {}", map.tiles().attribution)
    }
}
