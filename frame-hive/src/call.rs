//! Call and receipt surface.
//!
//! A host submits [`Transaction`]s, each carrying one [`Call`] and the
//! invoking principal, and gets back one [`Receipt`] per call. Failed calls
//! carry the numeric error code of the rejection.

use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::registry::Registry;
use crate::types::*;

/// One registry operation with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "function", rename_all = "kebab-case")]
pub enum Call {
    UploadPhoto {
        title: String,
        description: String,
        content_hash: String,
    },
    GetPhoto {
        id: PhotoId,
    },
    CreateGallery {
        title: String,
        description: String,
    },
    GetGallery {
        id: GalleryId,
    },
    RateGallery {
        gallery_id: GalleryId,
        rating: u64,
    },
    CreateCollaboration {
        title: String,
        description: String,
    },
    GetCollaboration {
        id: CollaborationId,
    },
    AwardPoints {
        target: Principal,
        amount: u64,
    },
    GetUserReputation {
        principal: Principal,
    },
}

impl Call {
    /// Wire name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UploadPhoto { .. } => "upload-photo",
            Self::GetPhoto { .. } => "get-photo",
            Self::CreateGallery { .. } => "create-gallery",
            Self::GetGallery { .. } => "get-gallery",
            Self::RateGallery { .. } => "rate-gallery",
            Self::CreateCollaboration { .. } => "create-collaboration",
            Self::GetCollaboration { .. } => "get-collaboration",
            Self::AwardPoints { .. } => "award-points",
            Self::GetUserReputation { .. } => "get-user-reputation",
        }
    }

    /// Whether the call can never change the ledger.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::GetPhoto { .. }
                | Self::GetGallery { .. }
                | Self::GetCollaboration { .. }
                | Self::GetUserReputation { .. }
        )
    }
}

/// A call together with the principal submitting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Transaction {
    pub sender: Principal,
    pub call: Call,
}

impl Transaction {
    pub fn new(sender: impl Into<Principal>, call: Call) -> Self {
        Self {
            sender: sender.into(),
            call,
        }
    }
}

/// Typed success value of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum CallValue {
    Uint(u64),
    Bool(bool),
    Photo(Option<Photo>),
    Gallery(Option<Gallery>),
    Collaboration(Option<Collaboration>),
    Reputation(Reputation),
}

/// Committed value or tagged rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok(CallValue),
    Err {
        code: u32,
        kind: String,
        message: String,
    },
}

impl From<&RegistryError> for Outcome {
    fn from(err: &RegistryError) -> Self {
        Self::Err {
            code: err.code(),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result record of one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Receipt {
    pub sender: Principal,
    pub function: String,
    pub outcome: Outcome,
}

impl Receipt {
    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, Outcome::Ok(_))
    }

    /// Success value, if the call committed.
    pub fn value(&self) -> Option<&CallValue> {
        match &self.outcome {
            Outcome::Ok(value) => Some(value),
            Outcome::Err { .. } => None,
        }
    }

    /// Error code, if the call was rejected.
    pub fn error_code(&self) -> Option<u32> {
        match &self.outcome {
            Outcome::Ok(_) => None,
            Outcome::Err { code, .. } => Some(*code),
        }
    }
}

impl Registry {
    /// Run a single call on behalf of `sender`.
    pub fn execute(&mut self, sender: &Principal, call: &Call) -> Receipt {
        let function = call.name();
        let outcome = match self.dispatch(sender, call) {
            Ok(value) => Outcome::Ok(value),
            Err(err) => {
                debug!(
                    function,
                    sender = %sender,
                    code = err.code(),
                    error = %err,
                    "Call rejected"
                );
                Outcome::from(&err)
            }
        };

        Receipt {
            sender: sender.clone(),
            function: function.to_string(),
            outcome,
        }
    }

    /// Run a block of transactions in submission order.
    ///
    /// A rejected call does not stop the block.
    pub fn apply_block(&mut self, transactions: &[Transaction]) -> Vec<Receipt> {
        transactions
            .iter()
            .map(|tx| self.execute(&tx.sender, &tx.call))
            .collect()
    }

    fn dispatch(&mut self, sender: &Principal, call: &Call) -> Result<CallValue> {
        let value = match call {
            Call::UploadPhoto {
                title,
                description,
                content_hash,
            } => CallValue::Uint(self.upload_photo(sender, title, description, content_hash)?),
            Call::GetPhoto { id } => CallValue::Photo(self.get_photo(*id).cloned()),
            Call::CreateGallery { title, description } => {
                CallValue::Uint(self.create_gallery(sender, title, description)?)
            }
            Call::GetGallery { id } => CallValue::Gallery(self.get_gallery(*id).cloned()),
            Call::RateGallery { gallery_id, rating } => {
                CallValue::Bool(self.rate_gallery(sender, *gallery_id, *rating)?)
            }
            Call::CreateCollaboration { title, description } => {
                CallValue::Uint(self.create_collaboration(sender, title, description)?)
            }
            Call::GetCollaboration { id } => {
                CallValue::Collaboration(self.get_collaboration(*id).cloned())
            }
            Call::AwardPoints { target, amount } => {
                CallValue::Bool(self.award_points(sender, target, *amount)?)
            }
            Call::GetUserReputation { principal } => {
                CallValue::Reputation(self.get_user_reputation(principal))
            }
        };
        Ok(value)
    }
}
