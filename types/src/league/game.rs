use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::ed25519::PublicKey;

/// Root record of a deployed game instance.
///
/// Created once by `initialize` and never mutated afterwards: the authority recorded here is
/// fixed for the lifetime of the game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    pub authority: PublicKey,
}

impl GameState {
    pub fn new(authority: PublicKey) -> Self {
        Self { authority }
    }
}

impl Write for GameState {
    fn write(&self, writer: &mut impl BufMut) {
        self.authority.write(writer);
    }
}

impl Read for GameState {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            authority: PublicKey::read(reader)?,
        })
    }
}

impl FixedSize for GameState {
    const SIZE: usize = PublicKey::SIZE;
}
