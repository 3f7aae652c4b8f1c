use super::*;

impl<'a, S: State> Layer<'a, S> {
    pub(in crate::layer) async fn handle_initialize(
        &mut self,
        signers: &Signers,
        accounts: &[PublicKey],
    ) -> Result<Handled> {
        let [game, authority] = accounts else {
            return Ok(Err(invalid_accounts(2, accounts.len())));
        };

        let game_account = self.account(game).await?;
        let game_state =
            match validate::initialize(signers, game, authority, game_account.as_ref()) {
                Ok(game_state) => game_state,
                Err(err) => return Ok(Err(err)),
            };

        self.insert(
            Key::Account(game.clone()),
            Value::GameState(game_state),
        );
        info!(game = ?game, authority = ?authority, "game initialized");

        Ok(Ok((
            vec![game.clone()],
            vec![Event::GameInitialized {
                game: game.clone(),
                authority: authority.clone(),
            }],
        )))
    }

    pub(in crate::layer) async fn handle_mint_player(
        &mut self,
        signers: &Signers,
        accounts: &[PublicKey],
        player_name: &str,
    ) -> Result<Handled> {
        let [game, player, user] = accounts else {
            return Ok(Err(invalid_accounts(3, accounts.len())));
        };

        let game_account = self.account(game).await?;
        let player_account = self.account(player).await?;
        let minted = match validate::mint_player(
            signers,
            player,
            user,
            game,
            game_account.as_ref(),
            player_account.as_ref(),
            player_name,
        ) {
            Ok(minted) => minted,
            Err(err) => return Ok(Err(err)),
        };

        let event = Event::PlayerMinted {
            player: player.clone(),
            owner: minted.owner.clone(),
            game: minted.game.clone(),
            name: minted.name.clone(),
        };
        self.insert(Key::Account(player.clone()), Value::Player(minted));
        info!(player = ?player, owner = ?user, name = player_name, "player minted");

        Ok(Ok((vec![player.clone()], vec![event])))
    }
}
