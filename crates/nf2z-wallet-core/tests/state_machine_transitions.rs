use alloy::primitives::Address;
use nf2z_wallet_core::{
    session_transition, ChainId, ProviderError, SessionAction, SessionError, SessionStatus,
    WalletSession,
};

fn account(seed: u8) -> Address {
    Address::repeat_byte(seed)
}

fn connected(seed: u8, chain: u64) -> WalletSession {
    WalletSession::Connected {
        account: account(seed),
        chain_id: ChainId(chain),
    }
}

#[test]
fn connect_happy_path_transitions() {
    let (s1, t1) = session_transition(&WalletSession::Disconnected, SessionAction::BeginConnect)
        .expect("disconnected -> connecting");
    assert_eq!(s1, WalletSession::Connecting);
    assert_eq!(t1.from, SessionStatus::Disconnected);
    assert_eq!(t1.to, SessionStatus::Connecting);

    let (s2, t2) = session_transition(
        &s1,
        SessionAction::Established {
            account: account(0xaa),
            chain_id: ChainId(1),
        },
    )
    .expect("connecting -> connected");
    assert_eq!(s2, connected(0xaa, 1));
    assert_eq!(t2.reason, "established");
}

#[test]
fn failed_connect_records_last_error_and_allows_retry() {
    let (s1, _) = session_transition(
        &WalletSession::Connecting,
        SessionAction::Fail(ProviderError::UserRejected),
    )
    .expect("connecting -> error");
    assert_eq!(s1.status(), SessionStatus::Error);
    assert_eq!(s1.last_error(), Some(&ProviderError::UserRejected));
    assert_eq!(s1.account(), None);
    assert_eq!(s1.chain_id(), None);

    let (s2, _) = session_transition(&s1, SessionAction::BeginConnect).expect("error -> connecting");
    assert_eq!(s2, WalletSession::Connecting);
}

#[test]
fn accounts_changed_keeps_chain_and_takes_first_account() {
    let (next, _) = session_transition(
        &connected(0xaa, 137),
        SessionAction::AccountsChanged(vec![account(0xbb), account(0xcc)]),
    )
    .expect("accounts changed");
    assert_eq!(next, connected(0xbb, 137));
}

#[test]
fn empty_accounts_changed_disconnects() {
    let (next, t) = session_transition(&connected(0xaa, 1), SessionAction::AccountsChanged(vec![]))
        .expect("accounts cleared");
    assert_eq!(next, WalletSession::Disconnected);
    assert_eq!(t.to, SessionStatus::Disconnected);
}

#[test]
fn chain_changed_keeps_account() {
    let (next, _) = session_transition(
        &connected(0xaa, 1),
        SessionAction::ChainChanged("0x89".parse().expect("hex chain id")),
    )
    .expect("chain changed");
    assert_eq!(next.account(), Some(account(0xaa)));
    assert_eq!(next.chain_id(), Some(ChainId(137)));
    assert_eq!(next.status(), SessionStatus::Connected);
}

#[test]
fn disconnect_is_legal_from_every_state() {
    let states = [
        WalletSession::Disconnected,
        WalletSession::Connecting,
        connected(0xaa, 1),
        WalletSession::Error {
            last_error: ProviderError::Timeout,
        },
    ];
    for state in states {
        let (next, _) =
            session_transition(&state, SessionAction::Disconnect).expect("disconnect always legal");
        assert_eq!(next, WalletSession::Disconnected);
    }
}

#[test]
fn illegal_transitions_are_rejected() {
    let err = session_transition(&WalletSession::Disconnected, SessionAction::ChainChanged(ChainId(1)))
        .expect_err("chain change needs a session");
    assert_eq!(
        err,
        SessionError::IllegalTransition {
            from: SessionStatus::Disconnected,
            action: "chain_changed",
        }
    );
    assert!(err.to_string().contains("illegal session transition"));

    session_transition(&connected(0xaa, 1), SessionAction::BeginConnect)
        .expect_err("already connected");
    session_transition(
        &WalletSession::Connecting,
        SessionAction::AccountsChanged(vec![account(0xbb)]),
    )
    .expect_err("accounts change while connecting");
    session_transition(
        &WalletSession::Disconnected,
        SessionAction::Established {
            account: account(0xaa),
            chain_id: ChainId(1),
        },
    )
    .expect_err("established without begin");
}

#[test]
fn account_and_chain_are_never_partially_populated() {
    let actions = [
        SessionAction::BeginConnect,
        SessionAction::Fail(ProviderError::Timeout),
        SessionAction::BeginConnect,
        SessionAction::Established {
            account: account(0x01),
            chain_id: ChainId(10),
        },
        SessionAction::AccountsChanged(vec![account(0x02)]),
        SessionAction::ChainChanged(ChainId(8453)),
        SessionAction::AccountsChanged(vec![]),
        SessionAction::ChainChanged(ChainId(1)),
        SessionAction::Disconnect,
    ];
    let mut session = WalletSession::default();
    for action in actions {
        if let Ok((next, _)) = session_transition(&session, action) {
            session = next;
        }
        assert_eq!(session.account().is_some(), session.chain_id().is_some());
        assert_eq!(session.last_error().is_some(), session.status() == SessionStatus::Error);
    }
    assert_eq!(session, WalletSession::Disconnected);
}
