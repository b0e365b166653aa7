use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{dtos::userdtos::SupervisorSummaryDto, models::chatmodels::ChatMessage};

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct SendMessageDto {
    #[validate(length(min = 1, max = 2000, message = "Message must be between 1 and 2000 characters"))]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDto {
    pub with_account_id: String,
    pub with_name: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentConversationDto {
    pub supervisor: SupervisorSummaryDto,
    pub messages: Vec<ChatMessage>,
}
