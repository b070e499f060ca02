use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, DeliveryError, Result};

use super::delivery::Deliverer;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a ReplyMarkup>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 2],
}

#[derive(Debug, Serialize)]
struct AnswerCallbackRequest<'a> {
    callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

impl CallbackQuery {
    /// Chat the button was pressed in, falling back to the user's own chat.
    pub fn chat_id(&self) -> i64 {
        self.message
            .as_ref()
            .map(|m| m.chat.id)
            .unwrap_or(self.from.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Keyboard {
        keyboard: Vec<Vec<KeyboardButton>>,
        resize_keyboard: bool,
        one_time_keyboard: bool,
    },
    InlineKeyboard {
        inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
    },
}

impl ReplyMarkup {
    /// Reply keyboard with one button per row.
    pub fn keyboard<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Keyboard {
            keyboard: labels
                .into_iter()
                .map(|text| vec![KeyboardButton { text: text.into() }])
                .collect(),
            resize_keyboard: true,
            one_time_keyboard: true,
        }
    }

    pub fn inline<I>(buttons: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self::InlineKeyboard {
            inline_keyboard: buttons
                .into_iter()
                .map(|(text, callback_data)| vec![InlineKeyboardButton { text, callback_data }])
                .collect(),
        }
    }
}

/// Minimal Bot API client: outbound messages and long-polled updates.
pub struct TelegramClient {
    client: Client,
    token: String,
}

impl TelegramClient {
    pub fn new(token: String, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, token })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", TELEGRAM_API_URL, self.token, method)
    }

    async fn call<B, T>(&self, method: &str, body: &B, timeout: Option<Duration>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.client.post(self.method_url(method)).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        let body: ApiResponse<T> = response.json().await?;

        if !body.ok {
            let description = body.description.unwrap_or_else(|| status.to_string());
            return Err(AppError::TelegramApi(format!("{}: {}", method, description)));
        }

        body.result
            .ok_or_else(|| AppError::TelegramApi(format!("{}: no result returned", method)))
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<&ReplyMarkup>,
    ) -> Result<Message> {
        let request = SendMessageRequest {
            chat_id,
            text,
            reply_markup,
        };
        self.call("sendMessage", &request, None).await
    }

    /// Long poll. The request timeout is stretched past the server-side
    /// wait so an idle poll is not cut short.
    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: ["message", "callback_query"],
        };
        self.call("getUpdates", &request, Some(timeout + Duration::from_secs(10)))
            .await
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str, text: Option<&str>) -> Result<()> {
        let request = AnswerCallbackRequest {
            callback_query_id,
            text,
        };
        let _: bool = self.call("answerCallbackQuery", &request, None).await?;
        Ok(())
    }
}

#[async_trait]
impl Deliverer for TelegramClient {
    async fn deliver(&self, recipient_id: i64, text: &str) -> std::result::Result<(), DeliveryError> {
        self.send_message(recipient_id, text, None)
            .await
            .map(|_| ())
            .map_err(|e| DeliveryError::failed(recipient_id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_keyboard_serializes_as_rows() {
        let markup = ReplyMarkup::keyboard(["Nicosia: Traffic Station", "Paphos: Traffic Station"]);
        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(json["keyboard"][1][0]["text"], "Paphos: Traffic Station");
        assert_eq!(json["one_time_keyboard"], true);
        assert!(json.get("inline_keyboard").is_none());
    }

    #[test]
    fn inline_keyboard_serializes_callback_data() {
        let markup = ReplyMarkup::inline([("Red only".to_string(), "filter_red_only".to_string())]);
        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(json["inline_keyboard"][0][0]["callback_data"], "filter_red_only");
    }

    #[test]
    fn send_message_omits_missing_markup() {
        let request = SendMessageRequest {
            chat_id: 42,
            text: "hi",
            reply_markup: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("reply_markup").is_none());
        assert_eq!(json["chat_id"], 42);
    }

    #[test]
    fn updates_deserialize() {
        let raw = r#"{"ok":true,"result":[
            {"update_id":7,"message":{"message_id":1,"chat":{"id":99},"from":{"id":99,"first_name":"Eleni"},"text":"/start"}},
            {"update_id":8,"callback_query":{"id":"cb1","from":{"id":99,"first_name":"Eleni"},"data":"filter_all"}}
        ]}"#;
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(raw).unwrap();
        let updates = response.result.unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].message.as_ref().unwrap().text.as_deref(), Some("/start"));

        let callback = updates[1].callback_query.as_ref().unwrap();
        assert_eq!(callback.data.as_deref(), Some("filter_all"));
        assert_eq!(callback.chat_id(), 99);
    }

    #[test]
    fn error_response_carries_description() {
        let raw = r#"{"ok":false,"description":"Forbidden: bot was blocked by the user"}"#;
        let response: ApiResponse<Message> = serde_json::from_str(raw).unwrap();
        assert!(!response.ok);
        assert!(response.result.is_none());
        assert_eq!(
            response.description.as_deref(),
            Some("Forbidden: bot was blocked by the user")
        );
    }
}
