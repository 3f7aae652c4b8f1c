use super::*;

impl<'a, S: State> Layer<'a, S> {
    pub(in crate::layer) async fn handle_daily_check_in(
        &mut self,
        signers: &Signers,
        accounts: &[PublicKey],
    ) -> Result<Handled> {
        let [player, authority] = accounts else {
            return Ok(Err(invalid_accounts(2, accounts.len())));
        };

        let now = self.context.unix_timestamp;
        // A zero timestamp is the never-checked-in marker and must not be stored.
        anyhow::ensure!(now > 0, "execution clock before unix epoch: {now}");
        let player_account = self.account(player).await?;
        let mut record =
            match validate::daily_check_in(signers, authority, player_account.as_ref(), now) {
                Ok(record) => record,
                Err(err) => return Ok(Err(err)),
            };

        record.record_check_in(now);
        let event = Event::CheckedIn {
            player: player.clone(),
            timestamp: now,
            xp: record.xp,
            power: record.power,
        };
        self.insert(Key::Account(player.clone()), Value::Player(record));
        info!(player = ?player, timestamp = now, "checked in");

        Ok(Ok((vec![player.clone()], vec![event])))
    }
}
