//! Solidity ABI encoding for the handful of game contract entry points.
//!
//! Selectors and event topics are the keccak-256 hashes of the canonical
//! signatures listed next to each constant.

use crate::{
    board::Multiplier,
    chain::{
        Address,
        LogEntry,
    },
};
use thiserror::Error;

const WORD: usize = 32;

/// `enterGame()`
pub const ENTER_GAME: [u8; 4] = [0x21, 0x8b, 0xd5, 0x77];
/// `makeChoice(uint256)`
pub const MAKE_CHOICE: [u8; 4] = [0x5b, 0xc5, 0x65, 0xfb];
/// `cashOut()`
pub const CASH_OUT: [u8; 4] = [0x79, 0x3c, 0xd7, 0x1e];
/// `getGameInfo(address)`
pub const GET_GAME_INFO: [u8; 4] = [0x0e, 0xa9, 0x01, 0xd2];
/// `getChoices()`
pub const GET_CHOICES: [u8; 4] = [0x98, 0xc8, 0x1b, 0xbf];

/// `ChoiceMade(uint256,uint256,bool,uint256)`
pub const CHOICE_MADE_TOPIC: [u8; 32] = [
    0x5f, 0xa1, 0x0e, 0x7b, 0xb8, 0x51, 0x5a, 0x62, 0xee, 0x12, 0x01, 0x62, 0x42, 0xd0,
    0xfc, 0xb1, 0x6e, 0x93, 0x1e, 0x7b, 0xab, 0x4d, 0x05, 0x1f, 0xf0, 0xfa, 0xf1, 0xa3,
    0x3f, 0x20, 0x8b, 0xd0,
];
/// `GameEntered(uint256,address,uint256)`
pub const GAME_ENTERED_TOPIC: [u8; 32] = [
    0xfd, 0xf5, 0xd8, 0x40, 0x10, 0xc9, 0x09, 0x8b, 0x5d, 0x43, 0x1f, 0xfd, 0x75, 0xf5,
    0x64, 0xfb, 0x7a, 0x46, 0x81, 0x26, 0x02, 0x92, 0x77, 0x39, 0xe4, 0x91, 0x40, 0x9c,
    0x64, 0x33, 0xd6, 0x95,
];
/// `CashedOut(uint256,address,uint256)`
pub const CASHED_OUT_TOPIC: [u8; 32] = [
    0x5f, 0x04, 0x0b, 0x58, 0xca, 0x1b, 0x9d, 0x6d, 0x03, 0xd1, 0xb5, 0x9d, 0x6d, 0x0b,
    0x83, 0x37, 0x38, 0x51, 0xa6, 0xb9, 0x9e, 0xb7, 0x54, 0x78, 0x43, 0x60, 0x30, 0x6f,
    0x96, 0xac, 0xe9, 0x26,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("payload too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
    #[error("{0} does not fit the target integer")]
    Overflow(&'static str),
    #[error("invalid bool word")]
    InvalidBool,
    #[error("unknown selector 0x{0}")]
    UnknownSelector(String),
    #[error("log is not a ChoiceMade event")]
    NotChoiceMade,
    #[error("malformed payload: {0}")]
    Malformed(String),
}

pub type AbiResult<T> = Result<T, AbiError>;

/// Calls understood by the game contract.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GameCall {
    EnterGame,
    MakeChoice { choice_index: u64 },
    CashOut,
    GetGameInfo { player: Address },
    GetChoices,
}

impl GameCall {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            GameCall::EnterGame => ENTER_GAME.to_vec(),
            GameCall::MakeChoice { choice_index } => {
                let mut out = MAKE_CHOICE.to_vec();
                out.extend_from_slice(&uint_word(u128::from(*choice_index)));
                out
            }
            GameCall::CashOut => CASH_OUT.to_vec(),
            GameCall::GetGameInfo { player } => {
                let mut out = GET_GAME_INFO.to_vec();
                out.extend_from_slice(&address_word(player));
                out
            }
            GameCall::GetChoices => GET_CHOICES.to_vec(),
        }
    }

    pub fn decode(calldata: &[u8]) -> AbiResult<Self> {
        ensure_len(calldata, 4)?;
        let (selector, args) = calldata.split_at(4);
        let selector: [u8; 4] = [selector[0], selector[1], selector[2], selector[3]];
        match selector {
            ENTER_GAME => Ok(GameCall::EnterGame),
            MAKE_CHOICE => Ok(GameCall::MakeChoice {
                choice_index: read_u64(args, 0, "choiceIndex")?,
            }),
            CASH_OUT => Ok(GameCall::CashOut),
            GET_GAME_INFO => Ok(GameCall::GetGameInfo {
                player: read_address(args, 0)?,
            }),
            GET_CHOICES => Ok(GameCall::GetChoices),
            other => Err(AbiError::UnknownSelector(hex::encode(other))),
        }
    }
}

/// Decoded `getGameInfo` tuple; the first and third fields are not used by the game.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RemoteGameInfo {
    pub game_id: u64,
    pub total_winnings: u128,
    pub bet_amount: u128,
    pub active: bool,
    pub games_played: u64,
}

impl RemoteGameInfo {
    pub fn decode(data: &[u8]) -> AbiResult<Self> {
        ensure_len(data, 5 * WORD)?;
        Ok(Self {
            game_id: read_u64(data, 0, "gameId")?,
            total_winnings: read_u128(data, 1, "totalWinnings")?,
            bet_amount: read_u128(data, 2, "betAmount")?,
            active: read_bool(data, 3)?,
            games_played: read_u64(data, 4, "gamesPlayed")?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(5 * WORD);
        out.extend_from_slice(&uint_word(u128::from(self.game_id)));
        out.extend_from_slice(&uint_word(self.total_winnings));
        out.extend_from_slice(&uint_word(self.bet_amount));
        out.extend_from_slice(&uint_word(u128::from(self.active)));
        out.extend_from_slice(&uint_word(u128::from(self.games_played)));
        out
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChoiceInfo {
    pub multiplier: Multiplier,
    pub win_chance_bps: u32,
}

/// Decodes a dynamic array of static tuples whose first member is the
/// multiplier; the tuple width is inferred from the payload.
pub fn decode_choices(data: &[u8]) -> AbiResult<Vec<ChoiceInfo>> {
    let offset = read_usize(data, 0, "offset")?;
    if offset % WORD != 0 {
        return Err(AbiError::Malformed(format!("unaligned array offset {offset}")));
    }
    let body = data
        .get(offset..)
        .ok_or(AbiError::TooShort {
            expected: offset,
            actual: data.len(),
        })?;
    let len = read_usize(body, 0, "length")?;
    if len == 0 {
        return Ok(Vec::new());
    }
    let elements = &body[WORD..];
    let words = elements.len() / WORD;
    if len > words {
        return Err(AbiError::TooShort {
            expected: len.saturating_mul(WORD),
            actual: elements.len(),
        });
    }
    let width = words / len;
    (0..len)
        .map(|i| {
            let bps = read_u64(elements, i * width, "multiplier")?;
            let multiplier = u32::try_from(bps).map_err(|_| AbiError::Overflow("multiplier"))?;
            let win_chance_bps = if width > 1 {
                u32::try_from(read_u64(elements, i * width + 1, "winChance")?)
                    .map_err(|_| AbiError::Overflow("winChance"))?
            } else {
                0
            };
            Ok(ChoiceInfo {
                multiplier: Multiplier::from_bps(multiplier),
                win_chance_bps,
            })
        })
        .collect()
}

pub fn encode_choices(choices: &[ChoiceInfo]) -> Vec<u8> {
    let mut out = Vec::with_capacity((2 + choices.len() * 2) * WORD);
    out.extend_from_slice(&uint_word(WORD as u128));
    out.extend_from_slice(&uint_word(choices.len() as u128));
    for choice in choices {
        out.extend_from_slice(&uint_word(u128::from(choice.multiplier.bps())));
        out.extend_from_slice(&uint_word(u128::from(choice.win_chance_bps)));
    }
    out
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChoiceMade {
    pub game_id: u64,
    pub choice_index: u64,
    pub won: bool,
    pub winnings: u128,
}

impl ChoiceMade {
    /// `gameId` is indexed; the remaining fields live in the data section.
    pub fn decode(log: &LogEntry) -> AbiResult<Self> {
        match log.topics.first() {
            Some(topic) if *topic == CHOICE_MADE_TOPIC => {}
            _ => return Err(AbiError::NotChoiceMade),
        }
        if let Some(game_topic) = log.topics.get(1) {
            Ok(Self {
                game_id: read_u64(game_topic, 0, "gameId")?,
                choice_index: read_u64(&log.data, 0, "choiceIndex")?,
                won: read_bool(&log.data, 1)?,
                winnings: read_u128(&log.data, 2, "winnings")?,
            })
        } else {
            Ok(Self {
                game_id: read_u64(&log.data, 0, "gameId")?,
                choice_index: read_u64(&log.data, 1, "choiceIndex")?,
                won: read_bool(&log.data, 2)?,
                winnings: read_u128(&log.data, 3, "winnings")?,
            })
        }
    }

    pub fn to_log(&self, contract: Address) -> LogEntry {
        let mut data = Vec::with_capacity(3 * WORD);
        data.extend_from_slice(&uint_word(u128::from(self.choice_index)));
        data.extend_from_slice(&uint_word(u128::from(self.won)));
        data.extend_from_slice(&uint_word(self.winnings));
        LogEntry {
            address: contract,
            topics: vec![CHOICE_MADE_TOPIC, uint_word(u128::from(self.game_id))],
            data,
        }
    }
}

/// First `ChoiceMade` among `logs`; entries that fail to decode are skipped.
pub fn find_choice_made(logs: &[LogEntry]) -> Option<ChoiceMade> {
    logs.iter().find_map(|log| ChoiceMade::decode(log).ok())
}

pub fn uint_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

pub fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&address.0);
    word
}

fn ensure_len(data: &[u8], expected: usize) -> AbiResult<()> {
    if data.len() < expected {
        return Err(AbiError::TooShort {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

fn word_at(data: &[u8], index: usize) -> AbiResult<&[u8]> {
    let start = index * WORD;
    ensure_len(data, start + WORD)?;
    Ok(&data[start..start + WORD])
}

fn read_u128(data: &[u8], index: usize, field: &'static str) -> AbiResult<u128> {
    let word = word_at(data, index)?;
    if word[..16].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow(field));
    }
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(bytes))
}

fn read_u64(data: &[u8], index: usize, field: &'static str) -> AbiResult<u64> {
    u64::try_from(read_u128(data, index, field)?).map_err(|_| AbiError::Overflow(field))
}

fn read_usize(data: &[u8], index: usize, field: &'static str) -> AbiResult<usize> {
    usize::try_from(read_u64(data, index, field)?).map_err(|_| AbiError::Overflow(field))
}

fn read_bool(data: &[u8], index: usize) -> AbiResult<bool> {
    let word = word_at(data, index)?;
    if word[..31].iter().any(|b| *b != 0) {
        return Err(AbiError::InvalidBool);
    }
    match word[31] {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(AbiError::InvalidBool),
    }
}

fn read_address(data: &[u8], index: usize) -> AbiResult<Address> {
    let word = word_at(data, index)?;
    if word[..12].iter().any(|b| *b != 0) {
        return Err(AbiError::Malformed("dirty address padding".to_string()));
    }
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&word[12..]);
    Ok(Address(bytes))
}
