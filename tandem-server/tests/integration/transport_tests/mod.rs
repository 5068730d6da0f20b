mod test_http_surface;
