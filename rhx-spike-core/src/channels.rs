//! Channel lookup for spike records.

use crate::cursor::ByteCursor;
use crate::decoder::DecodeError;
use crate::types::{Channel, FileFormat, FileHeader, CHANNEL_TOKEN_LEN};
use std::io::Read;

/// Channels declared by a file header, indexed by their position in the
/// header's channel lists.
#[derive(Debug, Clone)]
pub struct ChannelRegistry {
    channels: Vec<Channel>,
    single_channel_index: usize,
}

impl ChannelRegistry {
    /// Builds the registry from the header's native and custom name lists.
    ///
    /// `single_channel_index` is the channel every record of a
    /// single-channel file is attributed to.
    pub fn new(header: &FileHeader, single_channel_index: usize) -> Self {
        let channels = header
            .native_channel_names
            .iter()
            .zip(&header.custom_channel_names)
            .enumerate()
            .map(|(index, (native, custom))| Channel {
                index,
                native_name: native.clone(),
                custom_name: custom.clone(),
            })
            .collect();

        Self {
            channels,
            single_channel_index,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn single_channel_index(&self) -> usize {
        self.single_channel_index
    }

    /// Finds the first channel whose native name equals `token`.
    pub fn find_by_token(&self, token: &[u8]) -> Option<usize> {
        self.channels
            .iter()
            .position(|c| c.native_name.as_bytes() == token)
    }

    /// Resolves the channel of the record starting at the cursor.
    ///
    /// Multi-channel files consume the 5-byte channel token; single-channel
    /// files consume nothing and always map to the configured index.
    pub fn resolve<R: Read>(
        &self,
        format: FileFormat,
        cursor: &mut ByteCursor<R>,
    ) -> Result<usize, DecodeError> {
        match format {
            FileFormat::MultiChannel => {
                let offset = cursor.position();
                let mut token = [0u8; CHANNEL_TOKEN_LEN];
                cursor.read_exact(&mut token)?;
                self.find_by_token(&token)
                    .ok_or_else(|| DecodeError::UnknownChannel {
                        token: String::from_utf8_lossy(&token).into_owned(),
                        offset,
                    })
            }
            FileFormat::SingleChannel => Ok(self.single_channel_index),
        }
    }
}
