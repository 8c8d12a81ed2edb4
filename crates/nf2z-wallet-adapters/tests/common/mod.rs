#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use alloy::primitives::Address;

use nf2z_wallet_adapters::Eip1193Adapter;
use nf2z_wallet_core::{ConnectionController, SessionStatus, WalletSession};

pub type TestController = ConnectionController<Eip1193Adapter>;

/// Controller over a deterministic wallet plus a handle to script it.
pub fn new_controller() -> (TestController, Eip1193Adapter) {
    let provider = Eip1193Adapter::deterministic();
    (ConnectionController::new(provider.clone()), provider)
}

pub fn account_a() -> Address {
    "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
        .parse()
        .expect("valid account a")
}

pub fn account_b() -> Address {
    "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"
        .parse()
        .expect("valid account b")
}

/// Records every snapshot the store publishes.
pub fn record_snapshots(controller: &TestController) -> Rc<RefCell<Vec<WalletSession>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    controller
        .store()
        .subscribe(move |s| sink.borrow_mut().push(s.clone()));
    log
}

pub fn statuses(log: &Rc<RefCell<Vec<WalletSession>>>) -> Vec<SessionStatus> {
    log.borrow().iter().map(WalletSession::status).collect()
}
