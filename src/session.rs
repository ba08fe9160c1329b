//! Interactive session state: credentials, remembered ids and call history.

use chrono::Local;

use crate::dispatcher::Dispatcher;
use crate::extract::{ResourceIds, extract_ids};
use crate::history::{History, HistoryEntry};
use crate::transport::Transport;
use crate::types::{ActionParams, ApiResult, Credentials, DispatchRequest};

pub struct Session {
    credentials: Credentials,
    ids: ResourceIds,
    payer_id: Option<String>,
    history: History,
}

impl Session {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            ids: ResourceIds::default(),
            payer_id: None,
            history: History::new(),
        }
    }

    pub fn ids(&self) -> &ResourceIds {
        &self.ids
    }

    pub fn ids_mut(&mut self) -> &mut ResourceIds {
        &mut self.ids
    }

    pub fn set_payer_id(&mut self, payer_id: impl Into<String>) {
        self.payer_id = Some(payer_id.into());
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// Dispatch `action`, filling absent ids from memory and remembering the
    /// ids found in the response.
    pub async fn run<T: Transport>(
        &mut self,
        dispatcher: &Dispatcher<T>,
        action: &str,
        mut params: ActionParams,
    ) -> ApiResult {
        self.fill_params(&mut params);
        if let Some(payer_id) = &params.payer_id {
            self.payer_id = Some(payer_id.clone());
        }

        let request = DispatchRequest {
            credentials: self.credentials.clone(),
            action: action.to_string(),
            params,
        };
        let result = dispatcher.dispatch(&request).await;

        if let Some(response) = &result.http_response {
            let found = extract_ids(&response.body);
            if !found.is_empty() {
                tracing::debug!(?found, "remembering resource ids");
                self.ids.merge(found);
            }
        }

        let time = Local::now().format("%H:%M:%S").to_string();
        self.history.push(HistoryEntry::new(action, time, &result));
        result
    }

    fn fill_params(&self, params: &mut ActionParams) {
        let remembered = [
            (&mut params.payment_id, &self.ids.payment_id),
            (&mut params.sale_id, &self.ids.sale_id),
            (&mut params.authorization_id, &self.ids.authorization_id),
            (&mut params.order_id, &self.ids.order_id),
            (&mut params.capture_id, &self.ids.capture_id),
            (&mut params.refund_id, &self.ids.refund_id),
            (&mut params.payer_id, &self.payer_id),
        ];
        for (slot, known) in remembered {
            if slot.is_none() {
                slot.clone_from(known);
            }
        }
    }
}
