use std::hint::black_box;
use std::sync::Arc;

use bytes::BytesMut;
use criterion::{Criterion, criterion_group, criterion_main};
use tokio::sync::mpsc;
use tokio_util::codec::Decoder;
use wsconsole_http::codec::{FrameDecoder, FrameHeader, HeaderDecoder, encode_frame};
use wsconsole_http::connection::{BufferPool, FrameSender, Outbound};
use wsconsole_http::protocol::{ByteBuffer, OpCode};

const UPGRADE_REQUEST: &[u8] = b"GET /chat HTTP/1.1\r\n\
Host: localhost:8080\r\n\
Upgrade: websocket\r\n\
Connection: Upgrade\r\n\
Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
Sec-WebSocket-Version: 13\r\n\
Origin: http://localhost:8080\r\n\
\r\n";

fn masked_frame(payload_len: usize) -> Vec<u8> {
    let payload = vec![b'x'; payload_len];
    let mut buffer = ByteBuffer::new();
    encode_frame(&mut buffer, FrameHeader::new(true, OpCode::Text, payload_len).with_mask([1, 2, 3, 4]), &payload);
    buffer.as_bytes().to_vec()
}

fn bench_header_decoder(c: &mut Criterion) {
    c.bench_function("decode_upgrade_header", |b| {
        b.iter(|| {
            let mut buf = BytesMut::from(UPGRADE_REQUEST);
            black_box(HeaderDecoder::default().decode(&mut buf).unwrap())
        });
    });
}

fn bench_frame_decoder(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_frame");
    for size in [16, 1024, 64 * 1024] {
        let frame = masked_frame(size);
        group.bench_function(format!("payload_{size}"), |b| {
            b.iter(|| {
                let mut buf = BytesMut::from(&frame[..]);
                black_box(FrameDecoder::default().decode(&mut buf).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_fragmentation(c: &mut Criterion) {
    let payload = vec![b'y'; 16 * 1024];
    let pool = Arc::new(BufferPool::new(512));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut sender = FrameSender::new(512, Arc::clone(&pool), tx);

    c.bench_function("fragment_16k_into_512", |b| {
        b.iter(|| {
            let frames = sender.send(OpCode::Binary, black_box(&payload)).unwrap();
            while let Ok(Outbound::Frame(buffer)) = rx.try_recv() {
                pool.release(buffer);
            }
            black_box(frames)
        });
    });
}

criterion_group!(benches, bench_header_decoder, bench_frame_decoder, bench_fragmentation);
criterion_main!(benches);
