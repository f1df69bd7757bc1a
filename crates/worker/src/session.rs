//! Seam between the worker logic and the vendor's native control.

/// Asynchronous notifications raised by the control while events are pumped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Login finished; `err_code == 0` means connected.
    Connected { err_code: i32 },
    /// Data for a previously issued request is ready to be read.
    TrData {
        request_name: String,
        tr_code: String,
    },
}

/// Operations of the vendor control the worker relies on.
///
/// Calls follow the control's own conventions: integer return codes where
/// `0` is success and empty strings for missing fields.
pub trait VendorSession {
    /// Starts the login handshake. Completion arrives as
    /// [`SessionEvent::Connected`].
    fn comm_connect(&mut self) -> i32;

    fn login_info(&self, tag: &str) -> String;

    fn set_input_value(&mut self, key: &str, value: &str);

    /// Issues a request using the inputs set since the previous request.
    fn comm_rq_data(
        &mut self,
        request_name: &str,
        tr_code: &str,
        prev_next: i32,
        screen_no: &str,
    ) -> i32;

    fn get_comm_data(&self, tr_code: &str, record_name: &str, index: usize, item: &str) -> String;

    fn repeat_count(&self, tr_code: &str, record_name: &str) -> usize;

    /// Drains the events raised since the last call.
    fn process_events(&mut self) -> Vec<SessionEvent>;

    fn comm_terminate(&mut self);
}
