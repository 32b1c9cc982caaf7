use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use switchboard_interchange::{encode_typed, InterchangeError};

use super::{Action, ActionError, ValidationError, CATEGORY_FAILURE, CATEGORY_SUCCESS};
use crate::contacts::ContactUrn;
use crate::events::{AirtimeTransferred, EventPayload};
use crate::flow::RunScope;

pub(super) const TYPE: &str = "transfer_airtime";

/// Sends airtime to the contact's first phone number.
///
/// `amounts` maps currency codes to amounts; the service picks the currency
/// of the recipient's network. The sender is the address of the channel
/// that sends on `tel`, when there is one. With a `result_name`, the actual
/// amount sent is saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAirtimeAction {
    pub uuid: String,
    #[serde(with = "crate::numeric::json_number_map")]
    pub amounts: BTreeMap<String, Decimal>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub result_name: String,
}

impl Action for TransferAirtimeAction {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn type_name(&self) -> &'static str {
        TYPE
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.amounts.is_empty() {
            return Err(ValidationError::new(self, "at least one amount is required"));
        }
        if let Some((currency, _)) = self.amounts.iter().find(|(_, a)| a.is_sign_negative() || a.is_zero()) {
            return Err(ValidationError::new(
                self,
                format!("amount for '{}' must be positive", currency),
            ));
        }
        Ok(())
    }

    fn execute(&self, scope: &mut RunScope<'_>) -> Result<(), ActionError> {
        let Some(recipient) = scope.contact().urns.iter().find(|u| u.scheme == "tel").cloned() else {
            scope.error("can't transfer airtime to contact without a tel URN");
            return Ok(());
        };

        let assets = scope.assets();
        let sender = assets
            .channel_for_scheme("tel")
            .filter(|c| !c.address.is_empty())
            .map(|c| ContactUrn::new("tel", &c.address))
            .transpose()?;

        let transferred = scope
            .services()
            .airtime(&assets)
            .and_then(|service| service.transfer(sender.as_ref(), &recipient, &self.amounts));
        match transferred {
            Ok(transfer) => {
                let actual = transfer.actual_amount.normalize().to_string();
                scope.log(EventPayload::AirtimeTransferred(AirtimeTransferred {
                    sender: transfer.sender,
                    recipient: transfer.recipient,
                    currency: transfer.currency,
                    desired_amount: transfer.desired_amount,
                    actual_amount: transfer.actual_amount,
                }));
                if !self.result_name.is_empty() {
                    scope.save_result(&self.result_name, &actual, CATEGORY_SUCCESS, "", None);
                }
            }
            Err(e) => {
                scope.error(e.to_string());
                if !self.result_name.is_empty() {
                    scope.save_result(&self.result_name, "0", CATEGORY_FAILURE, "", None);
                }
            }
        }
        Ok(())
    }

    fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        encode_typed(TYPE, self)
    }
}
