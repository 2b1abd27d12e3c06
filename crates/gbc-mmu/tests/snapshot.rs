mod common;

use common::numbered_rom;
use gbc_mmu::{
    ConsoleMode, MapperType, Mmu, SnapshotError, StateIo, StateReader, StateWriter,
    mmu::{EXTENDED_TRAILER_LEN, LEGACY_STATE_LEN},
};

fn cgb_with_ram() -> Mmu {
    let mut mmu = Mmu::new_with_mode(true);
    let rom = numbered_rom(2, 0x03, 0x03, 0x80);
    mmu.load_rom(&rom, rom.len(), MapperType::from_header(&rom)).unwrap();
    mmu
}

#[test]
fn legacy_layout() {
    let mut mmu = cgb_with_ram();
    mmu.load_bios(&[0u8; 0x900], ConsoleMode::Cgb).unwrap();
    mmu.set_controller_state(0x08);
    mmu.write_byte(0xC000, 0x11);
    mmu.write_byte(0xFF70, 0x07);
    mmu.write_byte(0xDFFF, 0x22);
    mmu.write_byte(0x8000, 0x33);
    mmu.write_byte(0xA000, 0x44);

    let bytes = mmu.snapshot();
    assert_eq!(bytes.len(), LEGACY_STATE_LEN);
    assert_eq!(&bytes[..3], &[1, 0, 1]);
    assert_eq!(bytes[3], 0x11);
    assert_eq!(bytes[3 + 0x7FFF], 0x22);
    // VRAM bank 0 follows physical WRAM inside the 64 KiB field.
    assert_eq!(bytes[3 + 0x8000], 0x33);
    assert_eq!(bytes[3 + 0x10000], 0x44);
}

#[test]
fn legacy_restore_into_fresh_core() {
    let mut mmu = cgb_with_ram();
    mmu.begin_frame();
    mmu.write_byte(0xC123, 0x5A);
    mmu.write_byte(0x9FFF, 0x6B);
    mmu.write_byte(0xB000, 0x7C);
    let bytes = mmu.snapshot();

    let mut restored = cgb_with_ram();
    assert_eq!(restored.restore(&bytes), Ok(LEGACY_STATE_LEN));
    assert!(restored.lagged());
    assert!(!restored.regs.boot.is_active());
    assert_eq!(restored.read_byte(0xC123), 0x5A);
    assert_eq!(restored.read_byte(0x9FFF), 0x6B);
    assert_eq!(restored.read_byte(0xB000), 0x7C);
}

#[test]
fn truncated_snapshot_leaves_state_alone() {
    let mut mmu = cgb_with_ram();
    mmu.write_byte(0xC000, 0x99);
    let bytes = mmu.snapshot();

    let mut target = cgb_with_ram();
    target.write_byte(0xC000, 0x01);
    assert_eq!(
        target.restore(&bytes[..LEGACY_STATE_LEN - 1]),
        Err(SnapshotError::Truncated {
            needed: LEGACY_STATE_LEN,
            available: LEGACY_STATE_LEN - 1,
        })
    );
    assert_eq!(target.read_byte(0xC000), 0x01);
}

#[test]
fn snapshot_composes_with_other_components() {
    let mut mmu = cgb_with_ram();
    mmu.write_byte(0xC000, 0x12);

    let prefix = [0xDE, 0xAD];
    let mut out = StateWriter::new();
    out.bytes(&mut prefix.clone());
    let end = mmu.save_state(&mut out);
    assert_eq!(end, prefix.len() + LEGACY_STATE_LEN);

    let bytes = out.into_bytes();
    let mut r = StateReader::new(&bytes);
    let mut head = [0u8; 2];
    r.bytes(&mut head);
    assert_eq!(head, prefix);

    let mut restored = cgb_with_ram();
    assert_eq!(restored.load_state(&mut r), Ok(end));
    assert_eq!(restored.read_byte(0xC000), 0x12);
}

#[test]
fn extended_state_restores_registers_and_dma() {
    let mut mmu = cgb_with_ram();
    mmu.write_byte(0xFFFF, 0x15);
    mmu.write_byte(0xFF0F, 0x04);
    mmu.write_byte(0xFF70, 0x05);
    mmu.write_byte(0xFF4F, 0x01);
    mmu.write_byte(0x8000, 0xAB);
    mmu.write_byte(0xFE10, 0xCD);
    mmu.write_byte(0xFF90, 0xEF);
    mmu.write_byte(0xFF4D, 0x01);
    mmu.speed_switch();

    for i in 0..0x20u16 {
        mmu.write_byte(0xC000 + i, (i + 1) as u8);
    }
    mmu.write_byte(0xFF51, 0xC0);
    mmu.write_byte(0xFF52, 0x00);
    mmu.write_byte(0xFF53, 0x01);
    mmu.write_byte(0xFF54, 0x00);
    mmu.write_byte(0xFF55, 0x81);
    mmu.hdma_hblank_transfer();

    let mut w = StateWriter::new();
    let end = mmu.save_extended_state(&mut w);
    assert_eq!(end, LEGACY_STATE_LEN + EXTENDED_TRAILER_LEN);
    let bytes = w.into_bytes();

    let mut restored = cgb_with_ram();
    assert_eq!(
        restored.load_extended_state(&mut StateReader::new(&bytes)),
        Ok(end)
    );
    assert_eq!(restored.read_byte(0xFFFF), 0x15);
    assert_eq!(restored.read_byte(0xFF0F), 0xE4);
    assert_eq!(restored.read_byte(0xFF70), 0xFD);
    assert_eq!(restored.read_byte(0xFF4F), 0xFF);
    assert_eq!(restored.read_byte(0x8000), 0xAB);
    assert_eq!(restored.read_byte(0xFE10), 0xCD);
    assert_eq!(restored.read_byte(0xFF90), 0xEF);
    assert!(restored.double_speed());

    // One block left; it lands where the saved transfer would have put it.
    assert_eq!(restored.read_byte(0xFF55), 0x00);
    restored.hdma_hblank_transfer();
    assert_eq!(restored.read_byte(0xFF55), 0xFF);
    assert_eq!(restored.banks.vram[0x211F], 0x20);
}

#[test]
fn extended_snapshot_still_loads_as_legacy() {
    let mut mmu = cgb_with_ram();
    mmu.write_byte(0xC000, 0x77);
    let mut w = StateWriter::new();
    mmu.save_extended_state(&mut w);
    let bytes = w.into_bytes();

    let mut restored = cgb_with_ram();
    let mut r = StateReader::new(&bytes);
    assert_eq!(restored.load_state(&mut r), Ok(LEGACY_STATE_LEN));
    assert_eq!(r.remaining(), EXTENDED_TRAILER_LEN);
    assert_eq!(restored.read_byte(0xC000), 0x77);
}

#[test]
fn extended_load_rejects_legacy_only_snapshot() {
    let mut mmu = cgb_with_ram();
    let mut bytes = mmu.snapshot();
    bytes.resize(LEGACY_STATE_LEN + EXTENDED_TRAILER_LEN, 0);

    let mut target = cgb_with_ram();
    assert_eq!(
        target.load_extended_state(&mut StateReader::new(&bytes)),
        Err(SnapshotError::BadMagic)
    );
}

#[test]
fn extended_load_rejects_other_model() {
    let mut dmg = Mmu::default();
    dmg.write_byte(0xC000, 0x42);
    let mut w = StateWriter::new();
    dmg.save_extended_state(&mut w);
    let bytes = w.into_bytes();

    let mut cgb = cgb_with_ram();
    assert_eq!(
        cgb.load_extended_state(&mut StateReader::new(&bytes)),
        Err(SnapshotError::ModelMismatch {
            saved: ConsoleMode::Dmg,
            current: ConsoleMode::Cgb,
        })
    );
    assert_eq!(cgb.read_byte(0xC000), 0x00);
}
