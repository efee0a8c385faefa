use serde::{Deserialize, Serialize};

/// Spice level, serialized with the menu's labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpicyLevel {
    #[serde(rename = "不辣")]
    Plain,
    #[serde(rename = "微辣")]
    Mild,
    #[serde(rename = "中辣")]
    Medium,
    #[serde(rename = "重辣")]
    Hot,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spicy: Option<SpicyLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scallion: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coriander: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub qty: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<ItemAttributes>,
}

/// A cart line; `unit_price` is fixed at add time so later menu edits
/// do not reprice an existing order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub unit_price: f64,
    pub qty: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<ItemAttributes>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub store: String,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intro_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub praise: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,
}

/// Model answer, per the fixed schema the system prompt demands: a
/// structured order proposal or a plain chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AiResponse {
    ProductRecommendation {
        #[serde(default)]
        version: String,
        #[serde(default)]
        intent: String,
        #[serde(default)]
        scenario_tags: Vec<String>,
        reply: AiReply,
        order: Order,
        #[serde(default)]
        suggested_chips: Vec<String>,
    },
    GeneralChat {
        reply: ChatReply,
    },
}
