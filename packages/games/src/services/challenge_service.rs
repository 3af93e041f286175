use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::models::callback::InlineKeyboard;
use crate::models::challenge::Challenge;
use crate::models::game_session::GameKind;
use crate::models::player::{ChatId, MessageId, Player, PlayerId};
use crate::services::errors::challenge_service_errors::ChallengeServiceError;
use crate::services::game_context::GameContext;
use crate::services::timer_service::TurnTimerService;

type InviteKey = (ChatId, MessageId);

/// Invite, accept, decline and expiry of game challenges.
///
/// An invite lives in `pending` until it is answered or expires. Whoever
/// removes it from the map owns the outcome, so a late expiry after an
/// accept finds nothing and does nothing.
pub struct ChallengeService {
    ctx: Arc<GameContext>,
    pending: Mutex<HashMap<InviteKey, Challenge>>,
    expiries: TurnTimerService<InviteKey>,
}

impl ChallengeService {
    pub fn new(ctx: Arc<GameContext>) -> Self {
        ChallengeService {
            ctx,
            pending: Mutex::new(HashMap::new()),
            expiries: TurnTimerService::new(),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<InviteKey, Challenge>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }

    pub fn pending_invite(&self, chat_id: ChatId, message_id: MessageId) -> Option<Challenge> {
        self.pending().get(&(chat_id, message_id)).cloned()
    }

    pub async fn propose(
        self: &Arc<Self>,
        chat_id: ChatId,
        is_group: bool,
        kind: GameKind,
        proposer: &Player,
        target: Option<&Player>,
        is_rematch: bool,
    ) -> Result<Challenge, ChallengeServiceError> {
        if !is_group {
            return Err(ChallengeServiceError::GroupOnly);
        }
        let target = target.ok_or(ChallengeServiceError::MissingTarget)?;
        if target.id == proposer.id {
            return Err(ChallengeServiceError::SelfChallenge);
        }
        if target.is_bot {
            return Err(ChallengeServiceError::InvalidTarget);
        }
        if self.ctx.registry.is_active(chat_id, kind).await {
            return Err(ChallengeServiceError::SessionActive);
        }

        let text = if is_rematch {
            format!(
                "{} wants a {} rematch with {}! {}, do you accept?",
                proposer.mention(),
                kind.title(),
                target.mention(),
                target.mention()
            )
        } else {
            format!(
                "{} challenges {} to {}! {}, do you accept?",
                proposer.mention(),
                target.mention(),
                kind.title(),
                target.mention()
            )
        };
        let message_id = self
            .ctx
            .transport
            .send_message(chat_id, &text, Some(InlineKeyboard::invite(kind)))
            .await?;

        let challenge = Challenge::new(
            chat_id,
            kind,
            proposer.clone(),
            target.clone(),
            message_id,
            is_rematch,
        );
        self.pending()
            .insert((chat_id, message_id), challenge.clone());
        self.arm_expiry(chat_id, message_id);

        info!(chat_id, %kind, proposer = proposer.id, target = target.id, message_id, is_rematch, "Challenge proposed");
        Ok(challenge)
    }

    fn arm_expiry(self: &Arc<Self>, chat_id: ChatId, message_id: MessageId) {
        let this = Arc::clone(self);
        self.expiries.start(
            (chat_id, message_id),
            self.ctx.config.invite_timeout,
            move || async move {
                this.expire(chat_id, message_id).await;
            },
        );
    }

    pub async fn expire(&self, chat_id: ChatId, message_id: MessageId) {
        let removed = self.pending().remove(&(chat_id, message_id));
        let Some(challenge) = removed else {
            debug!(chat_id, message_id, "Invite already answered");
            return;
        };
        info!(chat_id, message_id, kind = %challenge.kind, "Challenge expired");
        if let Err(e) = self
            .ctx
            .transport
            .edit_message(chat_id, message_id, &challenge.expired_text())
            .await
        {
            warn!(chat_id, message_id, error = %e, "Failed to mark invite as expired");
        }
    }

    /// Consumes the invite when the invited player accepts it.
    ///
    /// The caller starts the game; the engine re-checks the chat under its
    /// own lock, so a second accept or a game started meanwhile is refused.
    pub async fn accept(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        player_id: PlayerId,
    ) -> Result<Challenge, ChallengeServiceError> {
        let challenge = {
            let mut pending = self.pending();
            let challenge = pending
                .get(&(chat_id, message_id))
                .ok_or(ChallengeServiceError::NotFound)?;
            if challenge.target.id != player_id {
                return Err(ChallengeServiceError::NotInvited);
            }
            pending
                .remove(&(chat_id, message_id))
                .ok_or(ChallengeServiceError::NotFound)?
        };
        self.expiries.cancel(&(chat_id, message_id));
        self.clear_invite(chat_id, message_id).await;

        if self.ctx.registry.is_active(chat_id, challenge.kind).await {
            return Err(ChallengeServiceError::SessionActive);
        }
        info!(chat_id, message_id, kind = %challenge.kind, player_id, "Challenge accepted");
        Ok(challenge)
    }

    pub async fn decline(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        player_id: PlayerId,
    ) -> Result<Challenge, ChallengeServiceError> {
        let challenge = {
            let mut pending = self.pending();
            let challenge = pending
                .get(&(chat_id, message_id))
                .ok_or(ChallengeServiceError::NotFound)?;
            if !challenge.involves(player_id) {
                return Err(ChallengeServiceError::NotInvited);
            }
            pending
                .remove(&(chat_id, message_id))
                .ok_or(ChallengeServiceError::NotFound)?
        };
        self.expiries.cancel(&(chat_id, message_id));

        let by = if player_id == challenge.proposer.id {
            &challenge.proposer
        } else {
            &challenge.target
        };
        let text = format!(
            "{} declined the {} challenge.",
            by.mention(),
            challenge.kind.title()
        );
        if let Err(e) = self
            .ctx
            .transport
            .edit_message(chat_id, message_id, &text)
            .await
        {
            warn!(chat_id, message_id, error = %e, "Failed to update declined invite");
        }
        info!(chat_id, message_id, player_id, "Challenge declined");
        Ok(challenge)
    }

    async fn clear_invite(&self, chat_id: ChatId, message_id: MessageId) {
        if let Err(e) = self.ctx.transport.clear_keyboard(chat_id, message_id).await {
            warn!(chat_id, message_id, error = %e, "Failed to clear invite buttons");
        }
    }
}
