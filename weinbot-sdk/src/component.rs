//! Outbound message building blocks: messages, embeds, and components.
//!
//! Serialized straight into the platform's JSON shapes. Component `type`
//! fields are fixed by the constructors, so callers never pick numbers.

use serde::{Serialize, Serializer};

/// Message flag: only the invoking user can see the message.
pub const FLAG_EPHEMERAL: u64 = 1 << 6;

/// Maximum number of action rows in a modal.
pub const MAX_MODAL_ROWS: usize = 5;

/// Labels of text inputs are capped by the platform.
pub const MAX_INPUT_LABEL: usize = 45;

fn is_zero(v: &u64) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Body for creating or editing a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    /// Always sent, so an edit with no rows removes existing controls.
    pub components: Vec<ActionRow>,
    #[serde(skip_serializing_if = "is_zero")]
    pub flags: u64,
}

impl MessagePayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn ephemeral(mut self) -> Self {
        self.flags |= FLAG_EPHEMERAL;
        self
    }

    pub fn is_ephemeral(&self) -> bool {
        self.flags & FLAG_EPHEMERAL != 0
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn row(mut self, row: ActionRow) -> Self {
        self.components.push(row);
        self
    }

    /// Every custom id in the message, in row order.
    pub fn custom_ids(&self) -> Vec<&str> {
        self.components
            .iter()
            .flat_map(|r| r.components.iter())
            .filter_map(Component::custom_id)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    /// RFC 3339 timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Embed {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter { text: text.into() });
        self
    }

    pub fn timestamp(mut self, ts: impl Into<String>) -> Self {
        self.timestamp = Some(ts.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "is_false")]
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    kind: u8,
    pub components: Vec<Component>,
}

impl ActionRow {
    pub fn new(components: Vec<Component>) -> Self {
        Self { kind: 1, components }
    }

    pub fn buttons(buttons: Vec<Button>) -> Self {
        Self::new(buttons.into_iter().map(Component::Button).collect())
    }

    pub fn select(select: StringSelect) -> Self {
        Self::new(vec![Component::Select(select)])
    }

    pub fn input(input: TextInput) -> Self {
        Self::new(vec![Component::Input(input)])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Component {
    Button(Button),
    Select(StringSelect),
    Input(TextInput),
}

impl Component {
    pub fn custom_id(&self) -> Option<&str> {
        match self {
            Component::Button(b) => Some(&b.custom_id),
            Component::Select(s) => Some(&s.custom_id),
            Component::Input(i) => Some(&i.custom_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary = 1,
    Secondary = 2,
    Success = 3,
    Danger = 4,
}

impl Serialize for ButtonStyle {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(*self as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Button {
    #[serde(rename = "type")]
    kind: u8,
    pub style: ButtonStyle,
    pub label: String,
    pub custom_id: String,
    #[serde(skip_serializing_if = "is_false")]
    pub disabled: bool,
}

impl Button {
    pub fn new(style: ButtonStyle, label: impl Into<String>, custom_id: impl Into<String>) -> Self {
        Self {
            kind: 2,
            style,
            label: label.into(),
            custom_id: custom_id.into(),
            disabled: false,
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StringSelect {
    #[serde(rename = "type")]
    kind: u8,
    pub custom_id: String,
    pub options: Vec<SelectOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub min_values: u8,
    pub max_values: u8,
}

impl StringSelect {
    pub fn new(custom_id: impl Into<String>, options: Vec<SelectOption>) -> Self {
        Self {
            kind: 3,
            custom_id: custom_id.into(),
            options,
            placeholder: None,
            min_values: 1,
            max_values: 1,
        }
    }

    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = Some(text.into());
        self
    }

    pub fn range(mut self, min: u8, max: u8) -> Self {
        self.min_values = min;
        self.max_values = max;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub default: bool,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            description: None,
            default: false,
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.default = selected;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextInputStyle {
    Short = 1,
    Paragraph = 2,
}

impl Serialize for TextInputStyle {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(*self as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextInput {
    #[serde(rename = "type")]
    kind: u8,
    pub custom_id: String,
    pub style: TextInputStyle,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u16>,
}

impl TextInput {
    /// Labels longer than the platform limit are cut on a char boundary.
    pub fn new(style: TextInputStyle, label: &str, custom_id: impl Into<String>) -> Self {
        Self {
            kind: 4,
            custom_id: custom_id.into(),
            style,
            label: label.chars().take(MAX_INPUT_LABEL).collect(),
            value: None,
            required: true,
            min_length: None,
            max_length: None,
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn length(mut self, min: u16, max: u16) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }
}

/// A form opened in response to an interaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Modal {
    pub custom_id: String,
    pub title: String,
    pub components: Vec<ActionRow>,
}

impl Modal {
    pub fn new(custom_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            title: title.into(),
            components: Vec::new(),
        }
    }

    pub fn input(mut self, input: TextInput) -> Self {
        self.components.push(ActionRow::input(input));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn button_row_wire_shape() {
        let payload = MessagePayload::text("hi").ephemeral().row(ActionRow::buttons(vec![
            Button::new(ButtonStyle::Success, "Annehmen", "accept:12345"),
            Button::new(ButtonStyle::Danger, "Ablehnen", "reject:12345").disabled(true),
        ]));
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            v,
            json!({
                "content": "hi",
                "flags": 64,
                "components": [{
                    "type": 1,
                    "components": [
                        { "type": 2, "style": 3, "label": "Annehmen", "custom_id": "accept:12345" },
                        { "type": 2, "style": 4, "label": "Ablehnen", "custom_id": "reject:12345", "disabled": true }
                    ]
                }]
            })
        );
        assert_eq!(payload.custom_ids(), vec!["accept:12345", "reject:12345"]);
    }

    #[test]
    fn select_and_input_wire_shape() {
        let select = StringSelect::new(
            "sel:1",
            vec![SelectOption::new("Riesling", "riesling").selected(true)],
        )
        .range(1, 3);
        let v = serde_json::to_value(ActionRow::select(select)).unwrap();
        assert_eq!(v["components"][0]["type"], 3);
        assert_eq!(v["components"][0]["max_values"], 3);
        assert_eq!(v["components"][0]["options"][0]["default"], true);

        let long = "x".repeat(80);
        let input = TextInput::new(TextInputStyle::Short, &long, "riesling").value("1");
        assert_eq!(input.label.chars().count(), MAX_INPUT_LABEL);
        let v = serde_json::to_value(Modal::new("qty:1", "Mengen").input(input)).unwrap();
        assert_eq!(v["components"][0]["components"][0]["type"], 4);
        assert_eq!(v["components"][0]["components"][0]["style"], 1);
        assert_eq!(v["components"][0]["components"][0]["value"], "1");
    }

    #[test]
    fn edits_always_send_components() {
        let v = serde_json::to_value(MessagePayload::text("done")).unwrap();
        assert_eq!(v, json!({ "content": "done", "components": [] }));
    }
}
