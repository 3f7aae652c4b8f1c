use super::*;

impl<'a, S: State> Layer<'a, S> {
    pub(in crate::layer) async fn handle_battle(
        &mut self,
        signers: &Signers,
        accounts: &[PublicKey],
        opponent_arg: &PublicKey,
        transaction: &Digest,
    ) -> Result<Handled> {
        let [player, opponent, authority] = accounts else {
            return Ok(Err(invalid_accounts(3, accounts.len())));
        };
        if opponent != opponent_arg {
            return Ok(Err(ProgramError::AccountMismatch));
        }

        let player_account = self.account(player).await?;
        let opponent_account = self.account(opponent).await?;
        let (mut player_record, mut opponent_record) = match validate::battle(
            signers,
            player,
            opponent,
            authority,
            player_account.as_ref(),
            opponent_account.as_ref(),
        ) {
            Ok(records) => records,
            Err(err) => return Ok(Err(err)),
        };

        // Outcome and both writes happen in this one transition.
        let outcome = crate::battle::resolve(
            &self.context.seed,
            transaction,
            player,
            &player_record,
            opponent,
            &opponent_record,
        );
        let winner = if outcome.player_wins {
            player_record.record_win();
            opponent_record.record_loss();
            player.clone()
        } else {
            opponent_record.record_win();
            player_record.record_loss();
            opponent.clone()
        };

        self.insert(Key::Account(player.clone()), Value::Player(player_record));
        self.insert(
            Key::Account(opponent.clone()),
            Value::Player(opponent_record),
        );
        info!(
            player = ?player,
            opponent = ?opponent,
            winner = ?winner,
            roll = outcome.roll,
            player_strength = outcome.player_strength,
            opponent_strength = outcome.opponent_strength,
            "battle resolved"
        );

        Ok(Ok((
            vec![player.clone(), opponent.clone()],
            vec![Event::BattleResolved {
                player: player.clone(),
                opponent: opponent.clone(),
                winner,
                player_strength: outcome.player_strength,
                opponent_strength: outcome.opponent_strength,
                roll: outcome.roll,
            }],
        )))
    }
}
