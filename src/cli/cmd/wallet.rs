use serde_json::Value;

use super::{CmdConfig, handler};
use crate::cli::builder::{CmdBuilder, CmdOpt, Command, required_opt};
use crate::cli::display::{Column, Displayable, Row};
use crate::cli::error::AnkrError;
use crate::cli::input;
use crate::hub::proto::{Balance, SendCoinsRequest};

const COLUMNS: &[Column] = &[
    Column::new("Address", "Address"),
    Column::new("Symbol", "Symbol"),
    Column::new("Amount", "Amount"),
];

struct Balances(Vec<Balance>);

impl Displayable for Balances {
    fn columns(&self) -> &'static [Column] {
        COLUMNS
    }

    fn rows(&self) -> Vec<Row> {
        self.0
            .iter()
            .map(|b| {
                Row::from([
                    ("Address", b.address.clone()),
                    ("Symbol", b.symbol.clone()),
                    ("Amount", b.amount.clone()),
                ])
            })
            .collect()
    }

    fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.0)
    }
}

pub(crate) fn register(b: &mut CmdBuilder<'_>, root: &mut Command) -> Result<(), AnkrError> {
    let wallet = b.build(
        root,
        None,
        "wallet",
        "Check balances and transfer tokens",
        &[CmdOpt::DocCategories(&["account"])],
    )?;

    let balance = b.build(
        wallet,
        Some(handler!(balance)),
        "balance <address>",
        "Show the balance of an address",
        &[CmdOpt::Display(COLUMNS)],
    )?;
    b.add_string_flag(balance, "symbol", None, "ANKR", "Token symbol", &[]);

    let send = b.build(
        wallet,
        Some(handler!(send_coins)),
        "sendcoins <symbol>",
        "Transfer tokens to another address",
        &[],
    )?;
    b.add_string_flag(
        send,
        "target-address",
        None,
        "",
        "Address receiving the tokens",
        &[required_opt()],
    );
    b.add_string_flag(send, "amount", None, "", "Amount to send", &[required_opt()]);
    b.add_bool_flag(send, "force", Some('f'), false, "Send without confirmation", &[]);

    Ok(())
}

async fn balance(c: &mut CmdConfig) -> color_eyre::Result<()> {
    c.require_args(1)?;
    let address = c.args[0].clone();
    let symbol = c.get_string("symbol")?;

    let hub = c.hub().await?;
    let balance = hub.balance(&symbol, &address).await?;
    c.display(&Balances(vec![balance]))?;
    Ok(())
}

async fn send_coins(c: &mut CmdConfig) -> color_eyre::Result<()> {
    c.require_args(1)?;
    let symbol = c.args[0].to_uppercase();
    let target_address = c.get_string("target-address")?;
    let amount = input::amount(&c.get_string("amount")?)?;

    c.confirm_unless_forced(&format!("send {amount} {symbol} to {target_address}"))?;

    let hub = c.hub().await?;
    let tx_hash = hub
        .send_coins(SendCoinsRequest {
            symbol,
            target_address,
            amount,
        })
        .await?;
    tracing::info!("transfer submitted as {tx_hash}");

    c.message(format_args!("Transfer submitted: {tx_hash}"))?;
    Ok(())
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::cli::cmd::harness::run;
    use crate::cli::error::AnkrError;
    use crate::hub::mock::MockHub;

    const SEND: &[&str] = &[
        "wallet",
        "sendcoins",
        "ankr",
        "--target-address",
        "0xabc",
        "--amount",
        "10",
    ];

    #[tokio::test]
    async fn declined_transfer_issues_no_call() {
        let hub = Arc::new(MockHub::default());
        let outcome = run(SEND, Arc::clone(&hub), &["no"]).await;

        assert!(matches!(outcome.error(), Some(AnkrError::ConfirmationDeclined)));
        assert!(hub.calls().is_empty());
        assert!(outcome.output.contains("send 10 ANKR to 0xabc"));
    }

    #[tokio::test]
    async fn confirmed_transfer() {
        let hub = Arc::new(MockHub::default());
        let outcome = run(SEND, Arc::clone(&hub), &["y"]).await;
        outcome.result.unwrap();
        assert_eq!(hub.calls(), vec!["send_coins ANKR 0xabc 10".to_string()]);
        assert!(outcome.output.contains("0xfeed"));
    }

    #[tokio::test]
    async fn forced_transfer_skips_the_prompt() {
        let hub = Arc::new(MockHub::default());
        let mut argv = SEND.to_vec();
        argv.push("--force");
        let outcome = run(&argv, Arc::clone(&hub), &[]).await;
        outcome.result.unwrap();
        assert_eq!(hub.calls().len(), 1);
    }

    #[tokio::test]
    async fn missing_amount_is_reported_before_prompting() {
        let hub = Arc::new(MockHub::default());
        let outcome = run(
            &["wallet", "sendcoins", "ankr", "--target-address", "0xabc"],
            Arc::clone(&hub),
            &[],
        )
        .await;
        assert!(matches!(
            outcome.error(),
            Some(AnkrError::MissingArguments(key)) if key == "ankr.wallet.sendcoins.amount"
        ));
        assert!(!outcome.output.contains("Are you sure"));
        assert!(hub.calls().is_empty());
    }

    #[tokio::test]
    async fn negative_amount_is_rejected() {
        let hub = Arc::new(MockHub::default());
        let outcome = run(
            &["wallet", "sendcoins", "ankr", "--target-address", "0xabc", "--amount=-5"],
            Arc::clone(&hub),
            &[],
        )
        .await;
        assert!(matches!(outcome.error(), Some(AnkrError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn balance_uses_the_symbol_flag() {
        let hub = Arc::new(MockHub::default());
        let outcome = run(
            &["wallet", "balance", "0xabc", "--output", "json"],
            Arc::clone(&hub),
            &[],
        )
        .await;
        outcome.result.unwrap();
        assert_eq!(hub.calls(), vec!["balance ANKR 0xabc".to_string()]);
        let json: serde_json::Value = serde_json::from_str(&outcome.output).unwrap();
        assert_eq!(json[0]["amount"], "100");
    }
}
