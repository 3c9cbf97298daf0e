use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::net::IpAddr;
use std::path::Path;

use ipnetwork::IpNetwork;
use tracing::{info, warn};

use crate::route::ASN;
use crate::shared::{PipelineError, Result, UNKNOWN_NAME};

/// One row of the ownership table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ASBlock {
    pub network: IpNetwork,
    pub name: String,
}

impl ASBlock {
    /// Parses a CIDR or a bare address. Bare addresses become host networks.
    pub fn parse(cidr: &str, name: &str) -> Result<Self> {
        let cidr = cidr.trim();
        let network = cidr
            .parse::<IpNetwork>()
            .map_err(|e| PipelineError::malformed(format!("ownership entry {:?}", cidr), e))?;
        Ok(ASBlock {
            network,
            name: name.trim().to_string(),
        })
    }

    /// Containment ignores host bits set in the block's address.
    pub fn contains(&self, ip: IpAddr) -> bool {
        self.network.contains(ip)
    }

    /// Address part of the block as written in the table.
    pub fn representative_ip(&self) -> IpAddr {
        self.network.ip()
    }
}

/// Maps AS numbers to the IP blocks registered to them.
#[derive(Debug, Clone, Default)]
pub struct ASBlockRegistry {
    blocks: HashMap<ASN, Vec<ASBlock>>,
    skipped_rows: usize,
}

impl ASBlockRegistry {
    pub fn new() -> Self {
        ASBlockRegistry {
            blocks: HashMap::new(),
            skipped_rows: 0,
        }
    }

    /// Loads a headerless `prefix_or_ip,asn,owner_name` CSV file.
    pub fn load_csv(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::MissingReferenceData {
                what: "AS-block ownership table",
                path: path.to_path_buf(),
            });
        }

        info!("Loading AS-block ownership table from {:?}", path);
        let registry = Self::from_reader(File::open(path)?)?;
        info!(
            "Loaded {} blocks for {} AS numbers ({} rows skipped)",
            registry.block_count(),
            registry.asn_count(),
            registry.skipped_rows
        );
        Ok(registry)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut registry = ASBlockRegistry::new();

        for (row_no, record) in csv_reader.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    warn!("ownership row {}: {}", row_no + 1, e);
                    registry.skipped_rows += 1;
                    continue;
                }
            };
            let (cidr, asn) = match (record.get(0), record.get(1)) {
                (Some(cidr), Some(asn)) if !asn.is_empty() => (cidr, asn),
                _ => {
                    warn!("ownership row {}: expected at least 2 columns", row_no + 1);
                    registry.skipped_rows += 1;
                    continue;
                }
            };
            let name = record.get(2).filter(|n| !n.is_empty()).unwrap_or(UNKNOWN_NAME);

            match ASBlock::parse(cidr, name) {
                Ok(block) => registry.insert(asn.to_string(), block),
                Err(e) => {
                    warn!("ownership row {}: {}", row_no + 1, e);
                    registry.skipped_rows += 1;
                }
            }
        }

        Ok(registry)
    }

    /// Appends a block, keeping table order per AS.
    pub fn insert(&mut self, asn: ASN, block: ASBlock) {
        self.blocks.entry(asn).or_default().push(block);
    }

    pub fn blocks(&self, asn: &str) -> &[ASBlock] {
        self.blocks.get(asn).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_registered(&self, asn: &str) -> bool {
        !self.blocks(asn).is_empty()
    }

    pub fn first_block(&self, asn: &str) -> Option<&ASBlock> {
        self.blocks(asn).first()
    }

    pub fn owner_name(&self, asn: &str) -> Option<&str> {
        self.first_block(asn).map(|b| b.name.as_str())
    }

    /// `None` when the AS has no registered blocks.
    pub fn owns(&self, asn: &str, ip: IpAddr) -> Option<bool> {
        let blocks = self.blocks(asn);
        if blocks.is_empty() {
            return None;
        }
        Some(blocks.iter().any(|block| block.contains(ip)))
    }

    pub fn asn_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.values().map(Vec::len).sum()
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}
