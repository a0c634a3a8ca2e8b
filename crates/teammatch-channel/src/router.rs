//! Routing from chat input to core operations

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use teammatch_core::{MatchError, MatchService, RespondOutcome};
use teammatch_types::{ExternalUserId, ProfileField, ProfileId, Response};
use tracing::{debug, info};

use crate::render;

/// Commands the bot understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand {
    Start,
    Register,
    Profile,
    Matches,
    Update,
    Cancel,
    Help,
}

/// Payload carried by an inline button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Respond {
        candidate: ProfileId,
        response: Response,
    },
    EditField(ProfileField),
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::Respond {
                candidate,
                response,
            } => write!(f, "{}:{}", response, candidate),
            CallbackAction::EditField(field) => write!(f, "update:{}", field.as_str()),
        }
    }
}

impl FromStr for CallbackAction {
    type Err = ();

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let (verb, arg) = data.split_once(':').ok_or(())?;
        if verb == "update" {
            return arg.parse().map(CallbackAction::EditField).map_err(|_| ());
        }
        let response = verb.parse::<Response>().map_err(|_| ())?;
        let candidate = arg.parse::<ProfileId>().map_err(|_| ())?;
        Ok(CallbackAction::Respond {
            candidate,
            response,
        })
    }
}

/// One event from a chat user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(ChatCommand),
    Text(String),
    Action(CallbackAction),
    /// Button data that no longer parses
    UnknownAction(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    fn new(label: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            label: label.into(),
            data: action.to_string(),
        }
    }
}

/// A message to deliver; `chat` may differ from the sender for match notices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub chat: ExternalUserId,
    pub text: String,
    pub buttons: Vec<Vec<Button>>,
}

impl Reply {
    fn text(chat: ExternalUserId, text: impl Into<String>) -> Self {
        Self {
            chat,
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    fn with_buttons(mut self, buttons: Vec<Vec<Button>>) -> Self {
        self.buttons = buttons;
        self
    }
}

/// Maps each inbound event to exactly one core operation
pub struct CommandRouter {
    service: Arc<MatchService>,
    max_listed: usize,
}

impl CommandRouter {
    /// `max_listed` caps the runners-up shown under the top candidate
    pub fn new(service: Arc<MatchService>, max_listed: usize) -> Self {
        Self {
            service,
            max_listed,
        }
    }

    pub async fn dispatch(&self, user: ExternalUserId, inbound: Inbound) -> Vec<Reply> {
        debug!("Dispatching {:?} from user {}", inbound, user);
        let result = match inbound {
            Inbound::Command(command) => self.on_command(user, command).await,
            Inbound::Text(text) => self.on_text(user, &text).await,
            Inbound::Action(action) => self.on_action(user, action).await,
            Inbound::UnknownAction(data) => {
                debug!("Ignoring stale button data {:?}", data);
                Ok(vec![Reply::text(user, render::STALE_BUTTON)])
            }
        };
        result.unwrap_or_else(|err| vec![Reply::text(user, render::error_text(&err))])
    }

    async fn on_command(
        &self,
        user: ExternalUserId,
        command: ChatCommand,
    ) -> Result<Vec<Reply>, MatchError> {
        let reply = match command {
            ChatCommand::Start => Reply::text(user, render::WELCOME),
            ChatCommand::Help => Reply::text(user, render::HELP),
            ChatCommand::Register => {
                let opened = self.service.begin_or_resume_registration(user).await?;
                Reply::text(user, opened.prompt)
            }
            ChatCommand::Profile => {
                let profile = self.service.get_profile(user).await?;
                let connections = self.service.connections(user).await?;
                Reply::text(user, render::profile_card(&profile, &connections))
            }
            ChatCommand::Matches => return self.show_candidates(user).await,
            ChatCommand::Update => {
                self.service.get_profile(user).await?;
                Reply::text(user, render::CHOOSE_FIELD).with_buttons(field_keyboard())
            }
            ChatCommand::Cancel => {
                let text = if self.service.abandon_session(user).await? {
                    render::CANCELLED
                } else {
                    render::NOTHING_TO_CANCEL
                };
                Reply::text(user, text)
            }
        };
        Ok(vec![reply])
    }

    async fn on_text(&self, user: ExternalUserId, text: &str) -> Result<Vec<Reply>, MatchError> {
        if text.starts_with('/') {
            return Ok(vec![Reply::text(user, render::UNKNOWN_COMMAND)]);
        }

        let outcome = self.service.submit_registration_answer(user, text).await?;
        let mut reply = Reply::text(user, outcome.prompt);
        if outcome.done {
            reply.text.push_str("\n\nUse /profile to view it or /matches to find teammates.");
        }
        Ok(vec![reply])
    }

    async fn on_action(
        &self,
        user: ExternalUserId,
        action: CallbackAction,
    ) -> Result<Vec<Reply>, MatchError> {
        match action {
            CallbackAction::EditField(field) => {
                let opened = self.service.begin_field_update(user, field).await?;
                Ok(vec![Reply::text(user, opened.prompt)])
            }
            CallbackAction::Respond {
                candidate,
                response,
            } => {
                let outcome = self
                    .service
                    .respond_to_candidate(user, candidate, response)
                    .await?;
                Ok(respond_replies(user, outcome))
            }
        }
    }

    async fn show_candidates(&self, user: ExternalUserId) -> Result<Vec<Reply>, MatchError> {
        let ranked = self.service.ranked_candidates_with_scores(user).await?;
        let Some((best, rest)) = ranked.split_first() else {
            return Ok(vec![Reply::text(user, render::NO_CANDIDATES)]);
        };

        let others = &rest[..rest.len().min(self.max_listed)];
        let buttons = vec![vec![
            Button::new(
                "🤝 Connect",
                CallbackAction::Respond {
                    candidate: best.profile.id,
                    response: Response::Connect,
                },
            ),
            Button::new(
                "❌ Reject",
                CallbackAction::Respond {
                    candidate: best.profile.id,
                    response: Response::Reject,
                },
            ),
        ]];
        Ok(vec![
            Reply::text(user, render::candidate_card(best, others)).with_buttons(buttons)
        ])
    }
}

fn field_keyboard() -> Vec<Vec<Button>> {
    ProfileField::ALL
        .chunks(2)
        .map(|row| {
            row.iter()
                .map(|field| Button::new(field.label(), CallbackAction::EditField(*field)))
                .collect()
        })
        .collect()
}

fn respond_replies(user: ExternalUserId, outcome: RespondOutcome) -> Vec<Reply> {
    match (outcome.response, outcome.counterpart) {
        (Response::Connect, Some(counterpart)) if outcome.newly_matched => {
            info!(
                "Notifying users {} and {} of their match",
                user, counterpart.external_user_id
            );
            vec![
                Reply::text(user, render::match_notice(&counterpart)),
                Reply::text(
                    counterpart.external_user_id,
                    render::match_notice(&outcome.requester),
                ),
            ]
        }
        (Response::Connect, Some(counterpart)) => {
            vec![Reply::text(user, render::match_notice(&counterpart))]
        }
        (Response::Connect, None) => vec![Reply::text(user, render::INTEREST_RECORDED)],
        (Response::Reject, _) if outcome.matched => vec![Reply::text(
            user,
            "You're already connected with this team member. Use /profile to see your connections.",
        )],
        (Response::Reject, _) => vec![Reply::text(user, render::REJECTED)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_data_round_trip() {
        let candidate = ProfileId::new();
        let action = CallbackAction::Respond {
            candidate,
            response: Response::Connect,
        };
        let data = action.to_string();
        assert_eq!(data, format!("connect:{}", candidate));
        assert_eq!(data.parse::<CallbackAction>(), Ok(action));

        let edit: CallbackAction = "update:looking_for_skills".parse().unwrap();
        assert_eq!(edit, CallbackAction::EditField(ProfileField::LookingForSkills));
    }

    #[test]
    fn test_callback_data_rejects_garbage() {
        assert!("connect:not-a-uuid".parse::<CallbackAction>().is_err());
        assert!("maybe:123".parse::<CallbackAction>().is_err());
        assert!("update:shoe_size".parse::<CallbackAction>().is_err());
        assert!("no separator".parse::<CallbackAction>().is_err());
    }

    #[test]
    fn test_field_keyboard_covers_every_field() {
        let data: Vec<String> = field_keyboard()
            .into_iter()
            .flatten()
            .map(|button| button.data)
            .collect();
        assert_eq!(data.len(), ProfileField::ALL.len());
        assert!(data.contains(&"update:project_idea".to_string()));
        // Telegram limits callback data to 64 bytes
        assert!(data.iter().all(|d| d.len() <= 64));
    }
}
