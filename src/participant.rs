//! Reference and receive (CC) parties on a document. They never gate routing.
use super::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, minicbor::Encode, minicbor::Decode)]
pub enum ParticipantType {
    #[n(0)]
    Reference,
    #[n(1)]
    Receive,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, minicbor::Encode, minicbor::Decode)]
pub struct Participant {
    #[n(0)]
    pub user_id: String,
    #[n(1)]
    pub participant_type: ParticipantType,
}

impl Participant {
    pub fn new(user_id: impl Into<String>, participant_type: ParticipantType) -> Self {
        Self {
            user_id: user_id.into(),
            participant_type,
        }
    }
    pub fn reference(user_id: impl Into<String>) -> Self {
        Self::new(user_id, ParticipantType::Reference)
    }
    pub fn receive(user_id: impl Into<String>) -> Self {
        Self::new(user_id, ParticipantType::Receive)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct ParticipantRegistry {
    #[n(0)]
    entries: Vec<Participant>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a participant. Returns false when the same user and type is already present.
    pub fn add(&mut self, participant: Participant) -> Result<bool, ValidationError> {
        if participant.user_id.trim().is_empty() {
            return Err(ValidationError::MissingField("participant user id"));
        }
        if self.entries.contains(&participant) {
            return Ok(false);
        }
        self.entries.push(participant);
        Ok(true)
    }

    /// Adds every participant, returning the ones that were new.
    pub fn extend(
        &mut self,
        participants: impl IntoIterator<Item = Participant>,
    ) -> Result<Vec<Participant>, ValidationError> {
        let mut added = vec![];
        for participant in participants {
            if self.add(participant.clone())? {
                added.push(participant);
            }
        }
        Ok(added)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.entries.iter()
    }

    pub fn of_type(&self, kind: ParticipantType) -> impl Iterator<Item = &Participant> {
        self.entries
            .iter()
            .filter(move |p| p.participant_type == kind)
    }

    pub fn contains_user(&self, user_id: &str) -> bool {
        self.entries.iter().any(|p| p.user_id == user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
