use std::io::{Read, Seek, SeekFrom, Write};

use raleighsl_codec::{MASTER_BLOCK_LEN, MasterBlock};

#[test]
fn master_block_round_trips_through_a_real_file() {
	let block = MasterBlock { format_id: 7, ctime: 1_700_000_000, uuid: [0x42u8; 16], label: "on-disk".to_string() };
	let encoded = block.encode().unwrap();

	let mut file = tempfile::NamedTempFile::new().unwrap();
	file.write_all(&encoded).unwrap();
	file.flush().unwrap();

	file.as_file_mut().seek(SeekFrom::Start(0)).unwrap();
	let mut raw = vec![0u8; MASTER_BLOCK_LEN];
	file.read_exact(&mut raw).unwrap();

	let decoded = MasterBlock::decode(&raw[..]).unwrap();
	assert_eq!(decoded, block);
}
