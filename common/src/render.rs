use std::fmt::Write as _;

use crate::{
    state::ChannelState,
    types::{ChannelId, ResponseMode},
};

pub trait PageRenderer {
    fn render_page(&self, state: &ChannelState, selected: &ChannelId) -> String;
}

/// Picks the page that matches how the client talks back to us.
pub fn renderer_for(mode: ResponseMode) -> Box<dyn PageRenderer + Send + Sync> {
    match mode {
        ResponseMode::FullPage => Box::new(FormPage),
        ResponseMode::NoContent => Box::new(LivePage),
    }
}

/// Plain HTML form: one slider for the selected channel and a radio per channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct FormPage;

/// One slider per channel, pushed to the panel with `fetch` on every change.
#[derive(Debug, Default, Clone, Copy)]
pub struct LivePage;

const PAGE_TITLE: &str = "LED Brightness Control";

impl PageRenderer for FormPage {
    fn render_page(&self, state: &ChannelState, selected: &ChannelId) -> String {
        let selected_value = state.get(selected).unwrap_or_default();

        let mut radios = String::new();
        for (index, (id, brightness)) in state.iter().enumerate() {
            let checked = if id == selected { " checked" } else { "" };
            let id = escape(id.as_str());
            let _ = writeln!(
                radios,
                r#"        <input type="radio" name="led" value="{id}"{checked}> LED {label} ({brightness}%)<br>"#,
                label = index + 1,
            );
        }

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>{PAGE_TITLE}</title>
    <style>
        body {{ font-family: Arial; margin: 40px; }}
        form {{ border: 1px solid #888; padding: 10px; width: 250px; }}
        label {{ display: block; margin-top: 10px; }}
        input[type=submit] {{ margin-top: 10px; }}
    </style>
</head>
<body>
    <form method="POST" action="/">
        <label><b>Brightness level:</b></label>
        <input type="range" name="brightness" min="0" max="100" value="{selected_value}">
        <br>
        <label><b>Select LED:</b></label>
{radios}        <input type="submit" value="Change Brightness">
    </form>
</body>
</html>
"#
        )
    }
}

impl PageRenderer for LivePage {
    fn render_page(&self, state: &ChannelState, _selected: &ChannelId) -> String {
        let mut controls = String::new();
        for (index, (id, brightness)) in state.iter().enumerate() {
            let id = escape(id.as_str());
            let _ = write!(
                controls,
                r#"        <div class="led-control">
            <span class="led-label">LED{label}</span>
            <input type="range" id="led-{id}" min="0" max="100" value="{brightness}" oninput="updateLED('{id}')">
            <span id="val-{id}" class="value-display">{brightness}</span>
        </div>
"#,
                label = index + 1,
            );
        }

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>{PAGE_TITLE}</title>
<style>
    body {{ font-family: Arial, sans-serif; margin: 40px; }}
    .control-box {{ border: 2px solid black; padding: 15px; width: 260px; border-radius: 8px; }}
    .led-control {{ display: flex; align-items: center; margin-bottom: 12px; }}
    .led-label {{ width: 50px; font-weight: bold; }}
    input[type="range"] {{ flex-grow: 1; margin: 0 10px; }}
    .value-display {{ width: 30px; text-align: right; font-weight: bold; }}
</style>
</head>
<body>
    <div class="control-box">
{controls}    </div>
<script>
function updateLED(id) {{
    const brightness = document.getElementById("led-" + id).value;
    document.getElementById("val-" + id).textContent = brightness;
    fetch("/", {{
        method: "POST",
        headers: {{ "Content-Type": "application/x-www-form-urlencoded" }},
        body: "led=" + id + "&brightness=" + brightness
    }});
}}
</script>
</body>
</html>
"#
        )
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
