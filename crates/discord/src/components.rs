//! Discord message component payloads (components v1: action rows + buttons).

use serde::{Serialize, Serializer};

pub const CONFIRM_YES_ID: &str = "session.confirm.yes.v1";
pub const CONFIRM_NO_ID: &str = "session.confirm.no.v1";

pub const CONFIRM_PROMPT: &str = "I noticed you might be trying to set up a study session.\n\
                                  Do you want me to post this in the study-planning channel?";

/// Discord wire values for button styles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

impl ButtonStyle {
    fn wire_value(self) -> u8 {
        match self {
            Self::Primary => 1,
            Self::Secondary => 2,
            Self::Success => 3,
            Self::Danger => 4,
        }
    }
}

impl Serialize for ButtonStyle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.wire_value())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Button {
    #[serde(rename = "type")]
    kind: u8,
    pub style: ButtonStyle,
    pub label: String,
    pub custom_id: String,
    pub disabled: bool,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: 2,
            style: ButtonStyle::Secondary,
            label: label.into(),
            custom_id: custom_id.into(),
            disabled: false,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = style;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    kind: u8,
    pub components: Vec<Button>,
}

impl ActionRow {
    pub fn new(components: Vec<Button>) -> Self {
        Self { kind: 1, components }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageReference {
    pub message_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessagePayload {
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ActionRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<MessageReference>,
}

pub struct MessageBuilder {
    content: String,
    components: Vec<ActionRow>,
    message_reference: Option<MessageReference>,
}

impl MessageBuilder {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), components: Vec::new(), message_reference: None }
    }

    pub fn reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.message_reference = Some(MessageReference { message_id: message_id.into() });
        self
    }

    pub fn buttons(mut self, buttons: Vec<Button>) -> Self {
        self.components.push(ActionRow::new(buttons));
        self
    }

    pub fn build(self) -> MessagePayload {
        MessagePayload {
            content: self.content,
            components: self.components,
            message_reference: self.message_reference,
        }
    }
}

fn confirm_buttons(disabled: bool) -> Vec<Button> {
    let yes = Button::new(CONFIRM_YES_ID, "Yes").style(ButtonStyle::Success);
    let no = Button::new(CONFIRM_NO_ID, "No").style(ButtonStyle::Danger);
    if disabled {
        vec![yes.disabled(), no.disabled()]
    } else {
        vec![yes, no]
    }
}

/// The yes/no prompt posted as a reply to the triggering message.
pub fn confirm_prompt_message(triggering_message_id: &str) -> MessagePayload {
    MessageBuilder::new(CONFIRM_PROMPT)
        .reply_to(triggering_message_id)
        .buttons(confirm_buttons(false))
        .build()
}

/// Replacement rows for the prompt once the workflow has resolved or expired.
pub fn disabled_confirm_rows() -> Vec<ActionRow> {
    vec![ActionRow::new(confirm_buttons(true))]
}

#[cfg(test)]
mod tests {
    use super::{
        confirm_prompt_message, disabled_confirm_rows, ButtonStyle, MessageBuilder,
        CONFIRM_NO_ID, CONFIRM_YES_ID,
    };

    #[test]
    fn prompt_replies_to_the_trigger_with_two_enabled_buttons() {
        let payload = confirm_prompt_message("123456");

        assert_eq!(
            payload.message_reference.as_ref().map(|r| r.message_id.as_str()),
            Some("123456")
        );
        assert_eq!(payload.components.len(), 1);

        let buttons = &payload.components[0].components;
        assert_eq!(buttons.len(), 2);
        assert_eq!(buttons[0].custom_id, CONFIRM_YES_ID);
        assert_eq!(buttons[0].style, ButtonStyle::Success);
        assert!(!buttons[0].disabled);
        assert_eq!(buttons[1].custom_id, CONFIRM_NO_ID);
        assert_eq!(buttons[1].style, ButtonStyle::Danger);
        assert!(!buttons[1].disabled);
    }

    #[test]
    fn disabled_rows_keep_both_buttons_but_disable_them() {
        let rows = disabled_confirm_rows();

        assert_eq!(rows.len(), 1);
        assert!(rows[0].components.iter().all(|button| button.disabled));
        assert_eq!(rows[0].components.len(), 2);
    }

    #[test]
    fn payload_serializes_to_discord_component_shapes() {
        let payload = confirm_prompt_message("9");
        let value = serde_json::to_value(&payload).expect("serializable");

        assert_eq!(value["components"][0]["type"], 1);
        assert_eq!(value["components"][0]["components"][0]["type"], 2);
        assert_eq!(value["components"][0]["components"][0]["style"], 3);
        assert_eq!(value["message_reference"]["message_id"], "9");
    }

    #[test]
    fn plain_message_omits_empty_component_fields() {
        let payload = MessageBuilder::new("hello").build();
        let value = serde_json::to_value(&payload).expect("serializable");

        assert!(value.get("components").is_none());
        assert!(value.get("message_reference").is_none());
    }
}
