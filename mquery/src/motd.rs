//! Message-of-the-day formatting.
//!
//! A MOTD arrives either as a legacy string with `§` formatting codes or as a
//! JSON chat component. Both are flattened into styled segments and rendered
//! three ways: the legacy `raw` string, a `clean` string without formatting,
//! and `html` markup using `motd-style-*` classes.

use std::fmt::{Display, Formatter, Write};

use askama_escape::{Html, escape};
use serde::{Deserialize, Serialize};

const SECTION: char = '§';

/// A rendered MOTD.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Motd {
    /// Legacy text with `§` formatting codes.
    pub raw: String,
    /// Plain text with all formatting removed.
    pub clean: String,
    /// Escaped HTML markup.
    pub html: String,
}

impl Motd {
    #[must_use]
    pub fn from_chat(chat: &Chat) -> Self {
        let mut segments = Vec::new();
        chat.flatten(Style::default(), &mut segments);
        Self::from_segments(&segments)
    }

    /// Formats a legacy `§`-coded string.
    #[must_use]
    pub fn from_legacy(text: &str) -> Self {
        let mut segments = Vec::new();
        parse_legacy(text, Style::default(), &mut segments);
        Self::from_segments(&segments)
    }

    fn from_segments(segments: &[Segment]) -> Self {
        Self {
            raw: render_raw(segments),
            clean: segments.iter().map(|segment| segment.text.as_str()).collect(),
            html: render_html(segments),
        }
    }
}

/// A Minecraft chat value as found in a server description.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Chat {
    String(String),
    List(Vec<Chat>),
    Component(Box<Component>),
}

impl Default for Chat {
    fn default() -> Self {
        Self::String(String::new())
    }
}

/// A styled chat component with optional children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Component {
    pub text: String,
    pub color: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underlined: Option<bool>,
    pub strikethrough: Option<bool>,
    pub obfuscated: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<Chat>,
}

impl Chat {
    /// The unformatted text of this value and all its children.
    #[must_use]
    pub fn text(&self) -> String {
        Motd::from_chat(self).clean
    }

    fn flatten(&self, parent: Style, out: &mut Vec<Segment>) {
        match self {
            Self::String(text) => parse_legacy(text, parent, out),
            Self::List(items) => {
                for item in items {
                    item.flatten(parent.clone(), out);
                }
            }
            Self::Component(component) => {
                let style = parent.inherit(component);
                parse_legacy(&component.text, style.clone(), out);
                for child in &component.extra {
                    child.flatten(style.clone(), out);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Color {
    /// A legacy color code, `0`-`9` or `a`-`f`.
    Code(char),
    /// A `#rrggbb` color.
    Hex(String),
}

impl Color {
    fn from_name(name: &str) -> Option<Self> {
        let code = match name {
            "black" => '0',
            "dark_blue" => '1',
            "dark_green" => '2',
            "dark_aqua" => '3',
            "dark_red" => '4',
            "dark_purple" => '5',
            "gold" => '6',
            "gray" => '7',
            "dark_gray" => '8',
            "blue" => '9',
            "green" => 'a',
            "aqua" => 'b',
            "red" => 'c',
            "light_purple" => 'd',
            "yellow" => 'e',
            "white" => 'f',
            hex if hex.len() == 7
                && hex.starts_with('#')
                && hex[1..].chars().all(|c| c.is_ascii_hexdigit()) =>
            {
                return Some(Self::Hex(hex.to_ascii_lowercase()));
            }
            _ => return None,
        };
        Some(Self::Code(code))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Style {
    color: Option<Color>,
    obfuscated: bool,
    bold: bool,
    strikethrough: bool,
    underlined: bool,
    italic: bool,
}

impl Style {
    fn inherit(&self, component: &Component) -> Self {
        Self {
            color: component
                .color
                .as_deref()
                .and_then(Color::from_name)
                .or_else(|| self.color.clone()),
            obfuscated: component.obfuscated.unwrap_or(self.obfuscated),
            bold: component.bold.unwrap_or(self.bold),
            strikethrough: component.strikethrough.unwrap_or(self.strikethrough),
            underlined: component.underlined.unwrap_or(self.underlined),
            italic: component.italic.unwrap_or(self.italic),
        }
    }

    fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    /// Format codes in `§k`..`§o` order.
    fn format_codes(&self) -> impl Iterator<Item = char> {
        [
            (self.obfuscated, 'k'),
            (self.bold, 'l'),
            (self.strikethrough, 'm'),
            (self.underlined, 'n'),
            (self.italic, 'o'),
        ]
        .into_iter()
        .filter_map(|(set, code)| set.then_some(code))
    }

    fn apply_code(&mut self, code: char) {
        match code {
            '0'..='9' | 'a'..='f' => {
                // a color code clears any formatting before it
                *self = Self {
                    color: Some(Color::Code(code)),
                    ..Self::default()
                };
            }
            'k' => self.obfuscated = true,
            'l' => self.bold = true,
            'm' => self.strikethrough = true,
            'n' => self.underlined = true,
            'o' => self.italic = true,
            'r' => *self = Self::default(),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    text: String,
    style: Style,
}

fn parse_legacy(text: &str, mut style: Style, out: &mut Vec<Segment>) {
    let mut current = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != SECTION {
            current.push(c);
            continue;
        }
        let Some(code) = chars.next() else {
            break;
        };
        if !current.is_empty() {
            out.push(Segment {
                text: std::mem::take(&mut current),
                style: style.clone(),
            });
        }
        style.apply_code(code.to_ascii_lowercase());
    }
    if !current.is_empty() {
        out.push(Segment {
            text: current,
            style,
        });
    }
}

fn render_raw(segments: &[Segment]) -> String {
    let mut out = String::new();
    let mut last = Style::default();
    for segment in segments {
        if segment.style != last {
            if !last.is_plain() {
                out.push(SECTION);
                out.push('r');
            }
            if let Some(Color::Code(code)) = segment.style.color {
                out.push(SECTION);
                out.push(code);
            }
            for code in segment.style.format_codes() {
                out.push(SECTION);
                out.push(code);
            }
            last = segment.style.clone();
        }
        out.push_str(&segment.text);
    }
    out
}

fn render_html(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        let mut lines = segment.text.split('\n');
        if let Some(first) = lines.next() {
            out.push_str(&Span::new(&segment.style, first).to_string());
        }
        for line in lines {
            out.push_str("<br />");
            out.push_str(&Span::new(&segment.style, line).to_string());
        }
    }
    out
}

struct Span<'a> {
    style: &'a Style,
    content: &'a str,
}

impl<'a> Span<'a> {
    const fn new(style: &'a Style, content: &'a str) -> Self {
        Self { style, content }
    }
}

impl Display for Span<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.content.is_empty() {
            return Ok(());
        }
        f.write_str("<span class=\"")?;
        if let Some(Color::Code(code)) = &self.style.color {
            write!(f, "motd-style-{code} ")?;
        }
        for code in self.style.format_codes() {
            write!(f, "motd-style-{code} ")?;
        }
        f.write_char('"')?;
        if let Some(Color::Hex(hex)) = &self.style.color {
            write!(f, " style=\"color: {hex}\"")?;
        }
        f.write_char('>')?;
        write!(f, "{}", escape(self.content, Html))?;
        f.write_str("</span>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_string() {
        let motd = Motd::from_legacy("No color codes");
        assert_eq!(motd.raw, "No color codes");
        assert_eq!(motd.clean, "No color codes");
        assert_eq!(motd.html, "<span class=\"\">No color codes</span>");
    }

    #[test]
    fn legacy_colors_and_reset() {
        let motd = Motd::from_legacy("§acolor a§rblank§bcolor b");
        assert_eq!(motd.clean, "color ablankcolor b");
        assert_eq!(motd.raw, "§acolor a§rblank§bcolor b");
        assert_eq!(
            motd.html,
            r#"<span class="motd-style-a ">color a</span><span class="">blank</span><span class="motd-style-b ">color b</span>"#
        );
    }

    #[test]
    fn formats_stack_on_color() {
        let motd = Motd::from_legacy("§a§nunderlined");
        assert_eq!(
            motd.html,
            r#"<span class="motd-style-a motd-style-n ">underlined</span>"#
        );
        // a later color clears the underline
        let motd = Motd::from_legacy("§n§lloud§cred");
        assert_eq!(motd.raw, "§l§nloud§r§cred");
    }

    #[test]
    fn uppercase_codes_and_trailing_section() {
        let motd = Motd::from_legacy("§Ahi§");
        assert_eq!(motd.clean, "hi");
        assert_eq!(motd.raw, "§ahi");
    }

    #[test]
    fn newlines_become_breaks() {
        let motd = Motd::from_legacy("Hello\n§eWorld");
        assert_eq!(motd.clean, "Hello\nWorld");
        assert_eq!(
            motd.html,
            r#"<span class="">Hello</span><br /><span class="motd-style-e ">World</span>"#
        );
    }

    #[test]
    fn escapes_html() {
        let motd = Motd::from_legacy("<script>alert(\"bad\");</script>");
        assert_eq!(
            motd.html,
            "<span class=\"\">&lt;script&gt;alert(&quot;bad&quot;);&lt;/script&gt;</span>"
        );
    }

    #[test]
    fn json_component_with_children() {
        let chat: Chat = serde_json::from_str(
            r##"{"text": "", "extra": [
                {"text": "Hyp", "color": "gold", "bold": true},
                {"text": "ixel", "color": "#ff00aa"},
                "\n§7plain"
            ]}"##,
        )
        .unwrap();
        let motd = Motd::from_chat(&chat);
        assert_eq!(motd.clean, "Hypixel\nplain");
        assert_eq!(motd.raw, "§6§lHyp§rixel§r\n§7plain");
        assert!(motd.html.contains(r#"<span class="motd-style-6 motd-style-l ">Hyp</span>"#));
        assert!(motd.html.contains(r#"<span class="" style="color: #ff00aa">ixel</span>"#));
        assert_eq!(chat.text(), "Hypixel\nplain");
    }

    #[test]
    fn children_inherit_style() {
        let chat: Chat = serde_json::from_str(
            r#"{"text": "a", "color": "red", "extra": [{"text": "b", "italic": true}]}"#,
        )
        .unwrap();
        assert_eq!(Motd::from_chat(&chat).raw, "§ca§r§c§ob");
    }

    #[test]
    fn plain_string_description() {
        let chat: Chat = serde_json::from_str(r#""A Minecraft Server""#).unwrap();
        assert_eq!(Motd::from_chat(&chat).clean, "A Minecraft Server");
        assert_eq!(Motd::from_chat(&Chat::default()), Motd::default());
    }
}
