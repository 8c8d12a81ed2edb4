use alloy::primitives::Address;
use nf2z_wallet_core::{
    short_address, ChainId, ProviderError, ProviderEvent, ProviderEventKind, WalletSession,
};
use nf2z_wallet_core::context::wallet_button_label;
use nf2z_wallet_core::domain::parse_accounts;
use nf2z_wallet_core::ports::{CODE_DISCONNECTED, CODE_INTERNAL, CODE_UNAUTHORIZED};

const ACCOUNT: &str = "0x1234567890123456789012345678901234567890";

#[test]
fn chain_id_accepts_hex_decimal_and_number() {
    assert_eq!("0x89".parse::<ChainId>().expect("hex"), ChainId(137));
    assert_eq!("0X1".parse::<ChainId>().expect("upper hex"), ChainId(1));
    assert_eq!("8453".parse::<ChainId>().expect("decimal"), ChainId(8453));
    assert_eq!(
        ChainId::from_json(&serde_json::json!(10)).expect("number"),
        ChainId(10)
    );
    assert_eq!(ChainId(137).to_hex(), "0x89");
    assert_eq!(ChainId(137).to_string(), "137");
}

#[test]
fn invalid_chain_id_maps_to_internal_error() {
    let err = "0xzz".parse::<ChainId>().expect_err("bad hex");
    assert!(matches!(err, ProviderError::Unknown { code, .. } if code == CODE_INTERNAL));
    ChainId::from_json(&serde_json::json!({"id": 1})).expect_err("object is not a chain id");
}

#[test]
fn parse_accounts_rejects_non_addresses() {
    let accounts = parse_accounts(&serde_json::json!([ACCOUNT])).expect("valid accounts");
    assert_eq!(accounts, vec![ACCOUNT.parse::<Address>().expect("address")]);
    parse_accounts(&serde_json::json!(["not-an-address"])).expect_err("bad address");
    parse_accounts(&serde_json::json!(ACCOUNT)).expect_err("not an array");
}

#[test]
fn event_payloads_with_bad_accounts_are_dropped() {
    let junk = serde_json::json!(["not-an-address", "0x12"]);
    assert_eq!(ProviderEvent::decode(ProviderEventKind::AccountsChanged, &junk), None);

    let mixed = serde_json::json!([ACCOUNT, 42]);
    assert_eq!(ProviderEvent::decode(ProviderEventKind::AccountsChanged, &mixed), None);

    let empty = serde_json::json!([]);
    assert_eq!(
        ProviderEvent::decode(ProviderEventKind::AccountsChanged, &empty),
        Some(ProviderEvent::AccountsChanged(Vec::new()))
    );
}

#[test]
fn event_payloads_decode_chain_and_disconnect() {
    assert_eq!(
        ProviderEvent::decode(ProviderEventKind::ChainChanged, &serde_json::json!("0x89")),
        Some(ProviderEvent::ChainChanged(ChainId(137)))
    );
    assert_eq!(
        ProviderEvent::decode(ProviderEventKind::ChainChanged, &serde_json::json!("mainnet")),
        None
    );
    assert_eq!(
        ProviderEvent::decode(
            ProviderEventKind::Disconnect,
            &serde_json::json!({"code": 1013, "message": "Try again later"})
        ),
        Some(ProviderEvent::Disconnect {
            code: 1013,
            message: "Try again later".to_owned(),
        })
    );
    assert_eq!(
        ProviderEvent::decode(
            ProviderEventKind::Disconnect,
            &serde_json::json!({"code": null, "message": null})
        ),
        Some(ProviderEvent::Disconnect {
            code: CODE_DISCONNECTED,
            message: String::new(),
        })
    );
}

#[test]
fn provider_error_maps_rpc_codes() {
    assert_eq!(ProviderError::from_rpc(4001, "denied"), ProviderError::UserRejected);
    assert_eq!(
        ProviderError::from_rpc(-32002, "already pending"),
        ProviderError::Unknown {
            code: -32002,
            message: "already pending".to_owned()
        }
    );
    assert!(matches!(
        ProviderError::no_accounts(),
        ProviderError::Unknown { code, .. } if code == CODE_UNAUTHORIZED
    ));
}

#[test]
fn wallet_session_serializes_with_camel_case_fields() {
    let session = WalletSession::Connected {
        account: ACCOUNT.parse().expect("address"),
        chain_id: ChainId(137),
    };
    let json = serde_json::to_value(&session).expect("serialize");
    assert_eq!(json["status"], "connected");
    assert_eq!(json["chainId"], 137);

    let back: WalletSession = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, session);

    let failed = WalletSession::Error {
        last_error: ProviderError::UserRejected,
    };
    let json = serde_json::to_value(&failed).expect("serialize error");
    assert_eq!(json["status"], "error");
    assert_eq!(json["lastError"]["kind"], "userRejected");
}

#[test]
fn event_kinds_use_eip1193_names() {
    let names: Vec<_> = ProviderEventKind::ALL.iter().map(|k| k.as_str()).collect();
    assert_eq!(names, vec!["accountsChanged", "chainChanged", "disconnect"]);
    assert_eq!(
        ProviderEvent::ChainChanged(ChainId(1)).kind(),
        ProviderEventKind::ChainChanged
    );
}

#[test]
fn button_label_follows_session() {
    let account: Address = ACCOUNT.parse().expect("address");
    assert_eq!(short_address(&account), "0x1234...7890");
    assert_eq!(wallet_button_label(&WalletSession::Disconnected), "Connect Wallet");
    assert_eq!(wallet_button_label(&WalletSession::Connecting), "Connecting...");
    assert_eq!(
        wallet_button_label(&WalletSession::Connected {
            account,
            chain_id: ChainId(1)
        }),
        "Disconnect (0x1234...7890)"
    );
    assert_eq!(
        wallet_button_label(&WalletSession::Error {
            last_error: ProviderError::NotInstalled
        }),
        "Connect Wallet"
    );
}
